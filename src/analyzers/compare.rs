use tracing::{debug, info};

use crate::analyzers::types::{ComparedTable, NamedColumn};
use crate::metrics::{MetricKey, MetricValues, MetricsTable};
use crate::quality::{DataQualityWarning, QualityReport};
use crate::zone::ZoneId;

/// Column name for scenario `scenario`'s copy of `metric`.
pub fn scenario_column(metric: &MetricKey, scenario: usize) -> String {
    format!("{metric}_{scenario}")
}

/// Column name for `later - earlier` of `metric`.
pub fn delta_column(metric: &MetricKey, later: usize, earlier: usize) -> String {
    format!("{metric}_{later}-{earlier}")
}

/// All index pairs `(i, j)` with `i < j`, in lexicographic order.
pub fn scenario_pairs(count: usize) -> Vec<(usize, usize)> {
    (0..count)
        .flat_map(|i| (i + 1..count).map(move |j| (i, j)))
        .collect()
}

/// Places every scenario's metrics side by side and differences every pair.
///
/// Rows are the zones present in all tables. Metrics absent from any table
/// are left out and recorded in `report`. Unreachable travel times become `infinity` before any
/// arithmetic, and each delta is the higher scenario index minus the lower.
#[tracing::instrument(skip(tables, report), fields(scenarios = tables.len()))]
pub fn compare_scenarios(
    tables: &[MetricsTable],
    infinity: f64,
    report: &mut QualityReport,
) -> ComparedTable {
    let Some(first) = tables.first() else {
        return ComparedTable::default();
    };

    // metrics[m] = (key, that metric's values in each table)
    let metrics: Vec<(&MetricKey, Vec<&MetricValues>)> = first
        .keys()
        .filter_map(|k| {
            let per_table: Option<Vec<_>> =
                tables.iter().map(|t| t.column(k).map(|c| &c.values)).collect();
            per_table.map(|v| (k, v))
        })
        .collect();
    for table in tables {
        for key in table.keys() {
            if !metrics.iter().any(|(k, _)| *k == key) {
                report.record(DataQualityWarning::MetricNotCompared {
                    metric: key.to_string(),
                });
            }
        }
    }

    let zones: Vec<ZoneId> = first
        .zones
        .iter()
        .filter(|z| tables.iter().all(|t| t.row_of(z).is_some()))
        .cloned()
        .collect();

    // rows[s][r]: row in table s for compared zone r
    let rows: Vec<Vec<usize>> = tables
        .iter()
        .map(|t| zones.iter().filter_map(|z| t.row_of(z)).collect())
        .collect();

    let mut columns = Vec::new();
    // by_scenario[s][m]: sentinel-substituted values of metric m in scenario s
    let mut by_scenario: Vec<Vec<Vec<f64>>> = Vec::with_capacity(tables.len());
    for (s, scenario_rows) in rows.iter().enumerate() {
        let mut per_metric = Vec::with_capacity(metrics.len());
        for (key, per_table) in &metrics {
            let values: Vec<f64> = scenario_rows
                .iter()
                .map(|&r| per_table[s].numeric(r, infinity))
                .collect();
            columns.push(NamedColumn {
                name: scenario_column(key, s),
                values: values.clone(),
            });
            per_metric.push(values);
        }
        by_scenario.push(per_metric);
    }

    for (i, j) in scenario_pairs(tables.len()) {
        for (m, (metric, _)) in metrics.iter().enumerate() {
            let earlier = &by_scenario[i][m];
            let later = &by_scenario[j][m];
            let values = later.iter().zip(earlier).map(|(b, a)| b - a).collect();
            columns.push(NamedColumn {
                name: delta_column(metric, j, i),
                values,
            });
        }
        debug!(earlier = i, later = j, "Scenario pair compared");
    }

    info!(
        zones = zones.len(),
        columns = columns.len(),
        "Scenario comparison complete"
    );
    ComparedTable { zones, columns }
}
