use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::table::{OpportunityTable, TravelTime, TravelTimeMatrix};
use crate::zone::ZoneId;

/// Counts the `opportunity` reachable from each zone within `threshold` minutes.
///
/// Destinations are joined to the opportunity table on zone id; destinations
/// missing from it contribute nothing. The result covers every zone of the
/// opportunity table exactly once, with 0 where nothing qualifies.
pub fn cumulative(
    matrix: &TravelTimeMatrix,
    opportunities: &OpportunityTable,
    opportunity: &str,
    threshold: u32,
) -> Result<BTreeMap<ZoneId, f64>, ConfigError> {
    let col = opportunities
        .column_index(opportunity)
        .ok_or_else(|| ConfigError::MissingOpportunity {
            opportunity: opportunity.to_string(),
        })?;
    let limit = f64::from(threshold);

    let mut result: BTreeMap<ZoneId, f64> =
        opportunities.zones().map(|z| (z.clone(), 0.0)).collect();

    for (origin, rows) in matrix.iter_origins() {
        let Some(total) = result.get_mut(origin) else {
            continue;
        };
        for (dest, time) in rows {
            let TravelTime::Reachable(minutes) = *time else {
                continue;
            };
            if minutes > limit {
                continue;
            }
            if let Some(count) = opportunities.value(dest, col) {
                *total += count;
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ZoneTable;

    fn z(s: &str) -> ZoneId {
        ZoneId::normalize(s, 12).unwrap()
    }

    fn example() -> (TravelTimeMatrix, OpportunityTable) {
        let r = TravelTime::Reachable;
        let matrix = vec![
            (z("A"), z("A"), r(0.0)),
            (z("A"), z("B"), r(5.0)),
            (z("A"), z("C"), r(12.0)),
            (z("B"), z("A"), r(5.0)),
            (z("B"), z("B"), r(0.0)),
            (z("B"), z("C"), r(9.0)),
        ]
        .into_iter()
        .collect();

        let mut opps = ZoneTable::new("opportunities", vec!["jobs".into()]);
        opps.insert(z("A"), vec![2.0]);
        opps.insert(z("B"), vec![0.0]);
        opps.insert(z("C"), vec![3.0]);
        (matrix, opps)
    }

    #[test]
    fn test_threshold_ten() {
        let (matrix, opps) = example();
        let result = cumulative(&matrix, &opps, "jobs", 10).unwrap();

        assert_eq!(result[&z("A")], 2.0);
        // B reaches A (5 min) and C (9 min)
        assert_eq!(result[&z("B")], 5.0);
        // C is never an origin but must still be present
        assert_eq!(result[&z("C")], 0.0);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (matrix, opps) = example();
        let result = cumulative(&matrix, &opps, "jobs", 12).unwrap();
        assert_eq!(result[&z("A")], 5.0);
    }

    #[test]
    fn test_unreachable_rows_never_count() {
        let mut opps = ZoneTable::new("opportunities", vec!["jobs".into()]);
        opps.insert(z("A"), vec![1.0]);
        opps.insert(z("B"), vec![4.0]);
        let matrix = vec![
            (z("A"), z("A"), TravelTime::Reachable(0.0)),
            (z("A"), z("B"), TravelTime::Unreachable),
        ]
        .into_iter()
        .collect();

        let result = cumulative(&matrix, &opps, "jobs", 120).unwrap();
        assert_eq!(result[&z("A")], 1.0);
        assert_eq!(result[&z("B")], 0.0);
    }

    #[test]
    fn test_origins_outside_analysis_area_dropped() {
        let (mut matrix, opps) = example();
        matrix.push(z("D"), z("A"), TravelTime::Reachable(1.0));
        let result = cumulative(&matrix, &opps, "jobs", 10).unwrap();
        assert!(!result.contains_key(&z("D")));
    }

    #[test]
    fn test_missing_opportunity_is_config_error() {
        let (matrix, opps) = example();
        let err = cumulative(&matrix, &opps, "hospitals", 10).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOpportunity { .. }));
    }
}
