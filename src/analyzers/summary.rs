use tracing::info;

use crate::analyzers::types::{ComparedTable, SummaryRow, SummaryTable};
use crate::analyzers::utility::{resolve_categories, shares};
use crate::error::ConfigError;
use crate::quality::{DataQualityWarning, QualityReport};
use crate::table::{DemographicsTable, ImpactArea};

/// Population-weighted average of every compared column, per demographic category.
///
/// Both tables are restricted to the impact area. Each category is normalized
/// by its own total over the restricted demographics rows, so zone shares sum
/// to 1 within a category; the summary is then `sum(value * share)` over the
/// zones that also have compared metrics. A category with no population in
/// the impact area is NaN in every row and is reported.
#[tracing::instrument(skip_all, fields(columns = compared.columns.len(), impact_zones = impact.len()))]
pub fn summarize(
    compared: &ComparedTable,
    demographics: &DemographicsTable,
    impact: &ImpactArea,
    categories: &[String],
    report: &mut QualityReport,
) -> Result<SummaryTable, ConfigError> {
    let (names, idx) = resolve_categories(demographics, categories)?;
    let local = demographics.restrict(impact);

    report.record_count(impact.len() - local.len(), |count| {
        DataQualityWarning::ImpactZonesWithoutDemographics { count }
    });

    let totals = local.column_totals(&idx);
    for (name, total) in names.iter().zip(&totals) {
        if *total == 0.0 {
            report.record(DataQualityWarning::ZeroPopulation {
                category: name.clone(),
            });
        }
    }

    // zones with both demographics and metrics, as compared-table rows
    let mut compared_rows = Vec::with_capacity(local.len());
    let mut counts: Vec<Vec<f64>> = vec![Vec::with_capacity(local.len()); idx.len()];
    let mut without_metrics = 0;
    for (zone, row) in local.iter() {
        if let Some(r) = compared.row_of(zone) {
            compared_rows.push(r);
            for (c, &col) in idx.iter().enumerate() {
                counts[c].push(row[col]);
            }
        } else {
            without_metrics += 1;
        }
    }
    report.record_count(without_metrics, |count| {
        DataQualityWarning::ImpactZonesWithoutMetrics { count }
    });

    // weights[c][k]: share of category c living in the kth zone
    let weights: Vec<Vec<f64>> = counts
        .iter()
        .zip(&totals)
        .map(|(values, &total)| shares(values, total))
        .collect();

    let rows = compared
        .columns
        .iter()
        .map(|column| {
            let values = weights
                .iter()
                .zip(&totals)
                .map(|(w, &total)| {
                    if total == 0.0 {
                        return f64::NAN;
                    }
                    compared_rows
                        .iter()
                        .zip(w)
                        .map(|(&r, share)| column.values[r] * share)
                        .sum()
                })
                .collect();
            SummaryRow {
                metric: column.name.clone(),
                values,
            }
        })
        .collect::<Vec<_>>();

    info!(
        metrics = rows.len(),
        categories = names.len(),
        zones = compared_rows.len(),
        "Demographic summary complete"
    );
    Ok(SummaryTable {
        categories: names,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::NamedColumn;
    use crate::table::ZoneTable;
    use crate::zone::ZoneId;
    use approx::assert_relative_eq;

    fn z(s: &str) -> ZoneId {
        ZoneId::normalize(s, 12).unwrap()
    }

    fn compared() -> ComparedTable {
        ComparedTable {
            zones: vec![z("A"), z("B"), z("C")],
            columns: vec![NamedColumn {
                name: "jobs_c30_1-0".into(),
                values: vec![10.0, 20.0, 90.0],
            }],
        }
    }

    fn demographics() -> DemographicsTable {
        let mut t = ZoneTable::new("demographics", vec!["pop".into(), "poor".into(), "empty".into()]);
        t.insert(z("A"), vec![100.0, 30.0, 0.0]);
        t.insert(z("B"), vec![300.0, 10.0, 0.0]);
        t.insert(z("C"), vec![600.0, 0.0, 0.0]);
        t
    }

    #[test]
    fn test_weights_restricted_to_impact_area() {
        let impact: ImpactArea = vec![z("A"), z("B")].into_iter().collect();
        let mut report = QualityReport::new();
        let summary = summarize(
            &compared(),
            &demographics(),
            &impact,
            &["pop".to_string(), "poor".to_string()],
            &mut report,
        )
        .unwrap();

        // pop shares 0.25 / 0.75 over A and B only
        assert_relative_eq!(summary.get("jobs_c30_1-0", "pop").unwrap(), 17.5);
        // poor shares 0.75 / 0.25
        assert_relative_eq!(summary.get("jobs_c30_1-0", "poor").unwrap(), 12.5);
        assert!(report.is_empty());
    }

    #[test]
    fn test_zero_population_is_nan_and_reported() {
        let impact: ImpactArea = vec![z("A"), z("B"), z("C")].into_iter().collect();
        let mut report = QualityReport::new();
        let summary = summarize(&compared(), &demographics(), &impact, &[], &mut report).unwrap();

        assert_eq!(summary.categories, vec!["pop", "poor", "empty"]);
        assert!(summary.get("jobs_c30_1-0", "empty").unwrap().is_nan());
        assert!(report.warnings.contains(&DataQualityWarning::ZeroPopulation {
            category: "empty".into()
        }));
    }

    #[test]
    fn test_constant_population_gives_mean() {
        let mut demo = ZoneTable::new("demographics", vec!["households".into()]);
        for id in ["A", "B", "C"] {
            demo.insert(z(id), vec![50.0]);
        }
        let impact: ImpactArea = vec![z("A"), z("B"), z("C")].into_iter().collect();
        let summary =
            summarize(&compared(), &demo, &impact, &[], &mut QualityReport::new()).unwrap();
        assert_relative_eq!(summary.get("jobs_c30_1-0", "households").unwrap(), 40.0);
    }

    #[test]
    fn test_missing_zones_reported_not_fatal() {
        let impact: ImpactArea = vec![z("A"), z("D")].into_iter().collect();
        let mut report = QualityReport::new();
        let summary =
            summarize(&compared(), &demographics(), &impact, &[], &mut report).unwrap();

        assert_relative_eq!(summary.get("jobs_c30_1-0", "pop").unwrap(), 10.0);
        assert!(report.warnings.contains(
            &DataQualityWarning::ImpactZonesWithoutDemographics { count: 1 }
        ));
    }

    #[test]
    fn test_unknown_category_is_config_error() {
        let impact: ImpactArea = vec![z("A")].into_iter().collect();
        let err = summarize(
            &compared(),
            &demographics(),
            &impact,
            &["elderly".to_string()],
            &mut QualityReport::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDemographic { .. }));
    }
}
