//! Per-scenario accessibility metrics.
//!
//! Two calculators produce one zone-indexed series each:
//! [`cumulative`] counts opportunities reachable within a threshold, and
//! [`travel_time`] finds the minutes needed to reach the nth opportunity.
//! [`assemble`] runs every configured combination and merges the series into
//! a [`MetricsTable`].

pub mod assemble;
pub mod cumulative;
pub mod travel_time;

use std::fmt;

use crate::config::AccessMethod;
use crate::table::TravelTime;
use crate::zone::ZoneId;

/// Which calculator produced a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Cumulative,
    TravelTime,
}

impl MetricKind {
    pub fn tag(self) -> char {
        match self {
            MetricKind::Cumulative => 'c',
            MetricKind::TravelTime => 't',
        }
    }

    pub fn of(method: &AccessMethod) -> Self {
        match method {
            AccessMethod::Cumulative { .. } => MetricKind::Cumulative,
            AccessMethod::TravelTime { .. } => MetricKind::TravelTime,
        }
    }
}

/// Identifies one `(opportunity, method, parameter)` column, rendered as
/// `{opportunity}_c{threshold}` or `{opportunity}_t{n}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub opportunity: String,
    pub kind: MetricKind,
    pub parameter: u32,
}

impl MetricKey {
    pub fn new(opportunity: impl Into<String>, kind: MetricKind, parameter: u32) -> Self {
        Self {
            opportunity: opportunity.into(),
            kind,
            parameter,
        }
    }

    /// Parses a column name back into a key. The opportunity part may itself
    /// contain underscores; only the last segment is interpreted.
    pub fn parse(column: &str) -> Option<Self> {
        let (opportunity, suffix) = column.rsplit_once('_')?;
        let mut chars = suffix.chars();
        let kind = match chars.next()? {
            'c' => MetricKind::Cumulative,
            't' => MetricKind::TravelTime,
            _ => return None,
        };
        let parameter = chars.as_str().parse().ok()?;
        if opportunity.is_empty() {
            return None;
        }
        Some(Self::new(opportunity, kind, parameter))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}{}", self.opportunity, self.kind.tag(), self.parameter)
    }
}

/// Column values aligned with [`MetricsTable::zones`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValues {
    /// Always defined; zones with nothing reachable hold 0.
    Cumulative(Vec<f64>),
    TravelTime(Vec<TravelTime>),
}

impl MetricValues {
    pub fn len(&self) -> usize {
        match self {
            MetricValues::Cumulative(v) => v.len(),
            MetricValues::TravelTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `row` with `Unreachable` replaced by `infinity`.
    pub fn numeric(&self, row: usize, infinity: f64) -> f64 {
        match self {
            MetricValues::Cumulative(v) => v[row],
            MetricValues::TravelTime(v) => v[row].or_sentinel(infinity),
        }
    }

    pub fn is_unreachable(&self, row: usize) -> bool {
        match self {
            MetricValues::Cumulative(_) => false,
            MetricValues::TravelTime(v) => !v[row].is_reachable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricColumn {
    pub key: MetricKey,
    pub values: MetricValues,
}

/// All metrics for one scenario: one row per analysis-area zone, sorted by zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTable {
    pub zones: Vec<ZoneId>,
    pub columns: Vec<MetricColumn>,
}

impl MetricsTable {
    pub fn row_of(&self, zone: &ZoneId) -> Option<usize> {
        self.zones.binary_search(zone).ok()
    }

    pub fn column(&self, key: &MetricKey) -> Option<&MetricColumn> {
        self.columns.iter().find(|c| &c.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.columns.iter().map(|c| &c.key)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
