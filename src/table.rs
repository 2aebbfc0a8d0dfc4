//! In-memory input tables, keyed by normalized [`ZoneId`].

use std::collections::{BTreeMap, BTreeSet};

use crate::zone::ZoneId;

/// Outcome of routing from one zone to another.
///
/// The routing engine leaves the cell empty when no path exists inside its
/// search horizon. That state is carried as a variant rather than as NaN so
/// it cannot leak into arithmetic by accident.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TravelTime {
    Reachable(f64),
    Unreachable,
}

impl TravelTime {
    pub fn from_minutes(minutes: Option<f64>) -> Self {
        match minutes {
            Some(m) if !m.is_nan() => TravelTime::Reachable(m),
            _ => TravelTime::Unreachable,
        }
    }

    pub fn minutes(self) -> Option<f64> {
        match self {
            TravelTime::Reachable(m) => Some(m),
            TravelTime::Unreachable => None,
        }
    }

    pub fn is_reachable(self) -> bool {
        matches!(self, TravelTime::Reachable(_))
    }

    /// Numeric stand-in for differencing: `Unreachable` becomes `infinity`.
    pub fn or_sentinel(self, infinity: f64) -> f64 {
        self.minutes().unwrap_or(infinity)
    }
}

/// Origin-destination travel times for one scenario, grouped by origin.
#[derive(Debug, Clone, Default)]
pub struct TravelTimeMatrix {
    by_origin: BTreeMap<ZoneId, Vec<(ZoneId, TravelTime)>>,
    len: usize,
}

impl TravelTimeMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, from: ZoneId, to: ZoneId, time: TravelTime) {
        self.by_origin.entry(from).or_default().push((to, time));
        self.len += 1;
    }

    /// Number of origin-destination rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn origins(&self) -> impl Iterator<Item = &ZoneId> {
        self.by_origin.keys()
    }

    pub fn rows_from(&self, origin: &ZoneId) -> Option<&[(ZoneId, TravelTime)]> {
        self.by_origin.get(origin).map(Vec::as_slice)
    }

    /// Whether `origin` has at least one routed destination.
    pub fn reaches_anything(&self, origin: &ZoneId) -> bool {
        self.rows_from(origin)
            .is_some_and(|rows| rows.iter().any(|(_, t)| t.is_reachable()))
    }

    /// Rows leaving each origin, in file order.
    pub fn iter_origins(&self) -> impl Iterator<Item = (&ZoneId, &[(ZoneId, TravelTime)])> {
        self.by_origin.iter().map(|(o, rows)| (o, rows.as_slice()))
    }
}

impl FromIterator<(ZoneId, ZoneId, TravelTime)> for TravelTimeMatrix {
    fn from_iter<I: IntoIterator<Item = (ZoneId, ZoneId, TravelTime)>>(iter: I) -> Self {
        let mut m = TravelTimeMatrix::new();
        for (from, to, time) in iter {
            m.push(from, to, time);
        }
        m
    }
}

/// Zone-indexed table of non-negative counts, one column per category.
///
/// Used for both opportunities (zone universe = analysis area) and
/// demographics (zone universe = impact area).
#[derive(Debug, Clone)]
pub struct ZoneTable {
    name: String,
    columns: Vec<String>,
    rows: BTreeMap<ZoneId, Vec<f64>>,
}

pub type OpportunityTable = ZoneTable;
pub type DemographicsTable = ZoneTable;

impl ZoneTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Inserts a row, returning `false` if the zone was already present.
    pub fn insert(&mut self, zone: ZoneId, values: Vec<f64>) -> bool {
        debug_assert_eq!(values.len(), self.columns.len());
        if self.rows.contains_key(&zone) {
            return false;
        }
        self.rows.insert(zone, values);
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, zone: &ZoneId) -> bool {
        self.rows.contains_key(zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneId> {
        self.rows.keys()
    }

    pub fn row(&self, zone: &ZoneId) -> Option<&[f64]> {
        self.rows.get(zone).map(Vec::as_slice)
    }

    pub fn value(&self, zone: &ZoneId, column: usize) -> Option<f64> {
        self.rows.get(zone).map(|r| r[column])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, &[f64])> {
        self.rows.iter().map(|(z, r)| (z, r.as_slice()))
    }

    /// Rows whose zone is in `area`. Zones missing on either side are dropped.
    pub fn restrict(&self, area: &ImpactArea) -> ZoneTable {
        ZoneTable {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|(z, _)| area.contains(z))
                .map(|(z, r)| (z.clone(), r.clone()))
                .collect(),
        }
    }

    /// Sum of each listed column over all rows.
    pub fn column_totals(&self, columns: &[usize]) -> Vec<f64> {
        let mut totals = vec![0.0; columns.len()];
        for row in self.rows.values() {
            for (t, &c) in totals.iter_mut().zip(columns) {
                *t += row[c];
            }
        }
        totals
    }
}

/// Zones whose residents count as affected by the scenarios.
#[derive(Debug, Clone, Default)]
pub struct ImpactArea {
    zones: BTreeSet<ZoneId>,
}

impl ImpactArea {
    pub fn contains(&self, zone: &ZoneId) -> bool {
        self.zones.contains(zone)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.iter()
    }
}

impl FromIterator<ZoneId> for ImpactArea {
    fn from_iter<I: IntoIterator<Item = ZoneId>>(iter: I) -> Self {
        ImpactArea {
            zones: iter.into_iter().collect(),
        }
    }
}
