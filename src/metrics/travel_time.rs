use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::table::{OpportunityTable, TravelTime, TravelTimeMatrix};
use crate::zone::ZoneId;

/// Minutes from each origin until `n` units of `opportunity` have been reached.
///
/// Only destinations holding at least one opportunity are considered, and a
/// destination counts once per opportunity located there. Destinations are
/// visited in ascending travel time (stable, so equal times keep file order);
/// the answer is the time at which the running total first reaches `n`.
///
/// Every origin of the matrix gets an entry. Origins that never accumulate
/// `n` opportunities are [`TravelTime::Unreachable`], which is distinct from
/// `Reachable(0.0)` for opportunities located at the origin itself.
pub fn travel_time_to_nth(
    matrix: &TravelTimeMatrix,
    opportunities: &OpportunityTable,
    opportunity: &str,
    n: u32,
) -> Result<BTreeMap<ZoneId, TravelTime>, ConfigError> {
    let col = opportunities
        .column_index(opportunity)
        .ok_or_else(|| ConfigError::MissingOpportunity {
            opportunity: opportunity.to_string(),
        })?;
    let target = f64::from(n);

    let mut result = BTreeMap::new();
    let mut candidates: Vec<(f64, f64)> = Vec::new();

    for (origin, rows) in matrix.iter_origins() {
        candidates.clear();
        candidates.extend(rows.iter().filter_map(|(dest, time)| {
            let minutes = time.minutes()?;
            let count = opportunities.value(dest, col)?;
            (count > 0.0).then_some((minutes, count))
        }));
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        result.insert(origin.clone(), nth_reached(&candidates, target));
    }

    Ok(result)
}

/// First time at which the cumulative count over sorted `(minutes, count)`
/// pairs reaches `target`.
fn nth_reached(sorted: &[(f64, f64)], target: f64) -> TravelTime {
    let mut running = 0.0;
    for &(minutes, count) in sorted {
        running += count;
        if running >= target {
            return TravelTime::Reachable(minutes);
        }
    }
    TravelTime::Unreachable
}
