use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::config::OpportunitySpec;
use crate::error::ConfigError;
use crate::metrics::cumulative::cumulative;
use crate::metrics::travel_time::travel_time_to_nth;
use crate::metrics::{MetricColumn, MetricKey, MetricKind, MetricValues, MetricsTable};
use crate::quality::{DataQualityWarning, QualityReport};
use crate::table::{OpportunityTable, TravelTime, TravelTimeMatrix};
use crate::zone::ZoneId;

enum Series {
    Cumulative(BTreeMap<ZoneId, f64>),
    TravelTime(BTreeMap<ZoneId, TravelTime>),
}

/// Every `(opportunity, parameter)` combination in declaration order.
pub fn metric_keys<'a>(specs: impl IntoIterator<Item = &'a OpportunitySpec>) -> Vec<MetricKey> {
    specs
        .into_iter()
        .flat_map(|spec| {
            let kind = MetricKind::of(&spec.method);
            spec.method
                .parameters()
                .iter()
                .map(move |&p| MetricKey::new(spec.key.clone(), kind, p))
        })
        .collect()
}

fn compute(
    matrix: &TravelTimeMatrix,
    opportunities: &OpportunityTable,
    key: &MetricKey,
) -> Result<Series, ConfigError> {
    let series = match key.kind {
        MetricKind::Cumulative => Series::Cumulative(cumulative(
            matrix,
            opportunities,
            &key.opportunity,
            key.parameter,
        )?),
        MetricKind::TravelTime => Series::TravelTime(travel_time_to_nth(
            matrix,
            opportunities,
            &key.opportunity,
            key.parameter,
        )?),
    };
    Ok(series)
}

/// Computes all configured metrics for one scenario and merges them on zone id.
///
/// The zone universe is the opportunity table. A metric whose opportunity is
/// not a column of that table is logged, recorded as skipped, and left out;
/// the remaining metrics are unaffected.
#[tracing::instrument(skip_all, fields(scenario = scenario, rows = matrix.len()))]
pub fn assemble_metrics(
    scenario: usize,
    matrix: &TravelTimeMatrix,
    opportunities: &OpportunityTable,
    specs: &[OpportunitySpec],
    report: &mut QualityReport,
) -> MetricsTable {
    let keys = metric_keys(specs);

    #[cfg(feature = "parallel")]
    let results: Vec<_> = keys
        .par_iter()
        .map(|key| compute(matrix, opportunities, key))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = keys
        .iter()
        .map(|key| compute(matrix, opportunities, key))
        .collect();

    let zones: Vec<ZoneId> = opportunities.zones().cloned().collect();

    let outside = matrix
        .origins()
        .filter(|o| !opportunities.contains(o))
        .count();
    report.record_count(outside, |count| DataQualityWarning::ZonesWithoutOpportunities {
        scenario,
        count,
    });

    let mut columns = Vec::with_capacity(keys.len());
    for (key, result) in keys.into_iter().zip(results) {
        let series = match result {
            Ok(series) => series,
            Err(e) => {
                error!(scenario, metric = %key, error = %e, "Skipping metric");
                report.record(DataQualityWarning::SkippedMetric {
                    scenario,
                    metric: key.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let values = match series {
            Series::Cumulative(map) => MetricValues::Cumulative(
                zones
                    .iter()
                    .map(|z| map.get(z).copied().unwrap_or(0.0))
                    .collect(),
            ),
            Series::TravelTime(map) => MetricValues::TravelTime(
                zones
                    .iter()
                    .map(|z| map.get(z).copied().unwrap_or(TravelTime::Unreachable))
                    .collect(),
            ),
        };
        debug!(scenario, metric = %key, rows = values.len(), "Metric computed");
        columns.push(MetricColumn { key, values });
    }

    let isolated = zones
        .iter()
        .filter(|z| !matrix.reaches_anything(z))
        .count();
    report.record_count(isolated, |count| DataQualityWarning::IsolatedZones {
        scenario,
        count,
    });

    info!(
        scenario,
        zones = zones.len(),
        metrics = columns.len(),
        "Metrics assembled"
    );
    MetricsTable { zones, columns }
}
