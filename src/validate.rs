//! Cross-table consistency checks run before any metric.
//!
//! Nothing here aborts a run: every finding is a zone list written under
//! `validation/` plus a [`DataQualityWarning`].

use std::collections::BTreeSet;
use std::path::Path;

use tracing::info;

use crate::error::InputError;
use crate::output::write_zone_list;
use crate::quality::{DataQualityWarning, QualityReport};
use crate::table::{DemographicsTable, ImpactArea, OpportunityTable, TravelTimeMatrix};
use crate::zone::ZoneId;

pub const IMPACT_OUTSIDE_FILE: &str = "impact_not_in_analysis_area.csv";
pub const MISSING_DEMOGRAPHICS_FILE: &str = "missing_demographics.csv";
pub const NO_OPPORTUNITIES_FILE: &str = "no_opportunities.csv";

/// Zone lists produced by [`validate_inputs`].
#[derive(Debug, Default, PartialEq)]
pub struct Findings {
    /// Impact-area zones absent from the opportunity table.
    pub impact_outside: Vec<ZoneId>,
    /// Impact-area zones without a demographics row.
    pub missing_demographics: Vec<ZoneId>,
    /// Matrix origins (any scenario) absent from the opportunity table.
    pub no_opportunities: Vec<ZoneId>,
}

#[tracing::instrument(skip_all, fields(scenarios = matrices.len(), impact_zones = impact.len()))]
pub fn validate_inputs(
    matrices: &[TravelTimeMatrix],
    opportunities: &OpportunityTable,
    demographics: &DemographicsTable,
    impact: &ImpactArea,
    categories: &[String],
    report: &mut QualityReport,
) -> Findings {
    let impact_outside: Vec<ZoneId> = impact
        .iter()
        .filter(|z| !opportunities.contains(z))
        .cloned()
        .collect();
    report.record_count(impact_outside.len(), |count| {
        DataQualityWarning::ImpactZonesOutsideAnalysisArea { count }
    });

    let missing_demographics: Vec<ZoneId> = impact
        .iter()
        .filter(|z| !demographics.contains(z))
        .cloned()
        .collect();
    report.record_count(missing_demographics.len(), |count| {
        DataQualityWarning::ImpactZonesWithoutDemographics { count }
    });

    let mut no_opportunities = BTreeSet::new();
    for (scenario, matrix) in matrices.iter().enumerate() {
        let before = no_opportunities.len();
        let mut outside = 0;
        for origin in matrix.origins().filter(|o| !opportunities.contains(o)) {
            outside += 1;
            no_opportunities.insert(origin.clone());
        }
        report.record_count(outside, |count| DataQualityWarning::ZonesWithoutOpportunities {
            scenario,
            count,
        });

        let isolated = opportunities
            .zones()
            .filter(|z| !matrix.reaches_anything(z))
            .count();
        report.record_count(isolated, |count| DataQualityWarning::IsolatedZones {
            scenario,
            count,
        });
        info!(
            scenario,
            new_outside = no_opportunities.len() - before,
            isolated,
            "Matrix checked"
        );
    }

    let requested = if categories.is_empty() {
        demographics.columns()
    } else {
        categories
    };
    let mut names = Vec::with_capacity(requested.len());
    let mut idx = Vec::with_capacity(requested.len());
    for category in requested {
        match demographics.column_index(category) {
            Some(i) => {
                names.push(category.clone());
                idx.push(i);
            }
            None => report.record(DataQualityWarning::UnknownDemographicCategory {
                category: category.clone(),
            }),
        }
    }
    let totals = demographics.restrict(impact).column_totals(&idx);
    for (category, total) in names.into_iter().zip(totals) {
        if total == 0.0 {
            report.record(DataQualityWarning::ZeroPopulation { category });
        }
    }

    Findings {
        impact_outside,
        missing_demographics,
        no_opportunities: no_opportunities.into_iter().collect(),
    }
}

/// Writes the three zone lists into `dir`, replacing earlier ones.
pub fn write_findings(dir: &Path, findings: &Findings) -> Result<(), InputError> {
    write_zone_list(&dir.join(IMPACT_OUTSIDE_FILE), &findings.impact_outside)?;
    write_zone_list(
        &dir.join(MISSING_DEMOGRAPHICS_FILE),
        &findings.missing_demographics,
    )?;
    write_zone_list(&dir.join(NO_OPPORTUNITIES_FILE), &findings.no_opportunities)?;
    Ok(())
}
