use tracing::{debug, info};

use crate::analyzers::types::{UnreachableRow, UnreachableTable};
use crate::analyzers::utility::resolve_categories;
use crate::config::OpportunitySpec;
use crate::error::ConfigError;
use crate::metrics::MetricsTable;
use crate::metrics::assemble::metric_keys;
use crate::table::{DemographicsTable, ImpactArea};

/// Population of impact-area zones that cannot reach each travel-time target.
///
/// For every scenario and every configured travel-time metric, sums each
/// demographic category over impact-area zones whose metric is unreachable.
/// Zones without a demographics row contribute nothing. With no travel-time
/// metrics configured the table is empty, which is not an error.
#[tracing::instrument(skip_all, fields(scenarios = metrics.len()))]
pub fn unreachable_population(
    metrics: &[MetricsTable],
    demographics: &DemographicsTable,
    impact: &ImpactArea,
    specs: &[OpportunitySpec],
    categories: &[String],
) -> Result<UnreachableTable, ConfigError> {
    let (names, idx) = resolve_categories(demographics, categories)?;

    let keys = metric_keys(specs.iter().filter(|s| s.method.is_travel_time()));

    let mut rows = Vec::new();
    for (scenario, table) in metrics.iter().enumerate() {
        // impact-area zones of this table with demographics: (table row, demographics row)
        let zones: Vec<(usize, &[f64])> = table
            .zones
            .iter()
            .enumerate()
            .filter(|(_, z)| impact.contains(z))
            .filter_map(|(r, z)| demographics.row(z).map(|d| (r, d)))
            .collect();

        for key in &keys {
            let Some(column) = table.column(key) else {
                debug!(scenario, metric = %key, "Metric absent from table, skipped");
                continue;
            };
            let mut totals = vec![0.0; idx.len()];
            for (r, demo) in &zones {
                if column.values.is_unreachable(*r) {
                    for (t, &c) in totals.iter_mut().zip(&idx) {
                        *t += demo[c];
                    }
                }
            }
            rows.push(UnreachableRow {
                scenario,
                metric: key.clone(),
                totals,
            });
        }
    }

    info!(rows = rows.len(), "Unreachable population computed");
    Ok(UnreachableTable {
        categories: names,
        rows,
    })
}
