//! Tables produced after the per-scenario metrics.

use serde::Serialize;

use crate::metrics::MetricKey;
use crate::zone::ZoneId;

/// A named numeric column aligned with the owning table's zone list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Every scenario's metrics side by side, plus pairwise deltas.
///
/// Values are already sentinel-substituted: an unreachable travel time is
/// `infinity_value` here, never NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparedTable {
    pub zones: Vec<ZoneId>,
    pub columns: Vec<NamedColumn>,
}

impl ComparedTable {
    pub fn row_of(&self, zone: &ZoneId) -> Option<usize> {
        self.zones.binary_search(zone).ok()
    }

    pub fn column(&self, name: &str) -> Option<&NamedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// One population-weighted average of a compared column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub metric: String,
    /// One value per demographic category; NaN when the category is empty.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTable {
    pub categories: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn get(&self, metric: &str, category: &str) -> Option<f64> {
        let c = self.categories.iter().position(|x| x == category)?;
        self.rows
            .iter()
            .find(|r| r.metric == metric)
            .map(|r| r.values[c])
    }
}

/// Population living in zones from which a travel-time metric is unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreachableRow {
    pub scenario: usize,
    pub metric: MetricKey,
    pub totals: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnreachableTable {
    pub categories: Vec<String>,
    pub rows: Vec<UnreachableRow>,
}
