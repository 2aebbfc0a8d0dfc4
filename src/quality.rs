use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A finding about the inputs that does not stop the run.
///
/// Computation carries on producing 0 or `Unreachable`/NaN as defined for
/// each stage; the warning makes sure the gap is visible afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Matrix origins with no row in the opportunity table.
    ZonesWithoutOpportunities { scenario: usize, count: usize },
    /// Impact-area zones with no row in the demographics table.
    ImpactZonesWithoutDemographics { count: usize },
    /// Impact-area zones with no row in the opportunity table.
    ImpactZonesOutsideAnalysisArea { count: usize },
    /// Impact-area zones absent from the compared metrics.
    ImpactZonesWithoutMetrics { count: usize },
    /// A demographic category sums to zero over the impact area; its weighted
    /// summaries are NaN.
    ZeroPopulation { category: String },
    /// A configured demographic category that is not a column of the
    /// demographics table. Population stages fail on it; validation does not.
    UnknownDemographicCategory { category: String },
    /// Analysis-area zones that reach no destination at all in a scenario.
    IsolatedZones { scenario: usize, count: usize },
    /// A metric skipped because its configuration does not match the inputs.
    SkippedMetric {
        scenario: usize,
        metric: String,
        reason: String,
    },
    /// A metric absent from at least one scenario's metrics, left out of the
    /// comparison.
    MetricNotCompared { metric: String },
}

/// Warnings collected by one or more stages of a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub warnings: Vec<DataQualityWarning>,
}

impl Default for QualityReport {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityReport {
    pub fn new() -> Self {
        QualityReport {
            generated_at: Utc::now(),
            warnings: Vec::new(),
        }
    }

    /// Logs and keeps a warning. A finding already on record is not repeated.
    pub fn record(&mut self, warning: DataQualityWarning) {
        if self.warnings.contains(&warning) {
            return;
        }
        warn!(?warning, "Data quality warning");
        self.warnings.push(warning);
    }

    /// Records a zone-count warning only when `count` is non-zero.
    pub fn record_count(&mut self, count: usize, make: impl FnOnce(usize) -> DataQualityWarning) {
        if count > 0 {
            self.record(make(count));
        }
    }

    pub fn merge(&mut self, other: QualityReport) {
        for warning in other.warnings {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_count_skips_zero() {
        let mut report = QualityReport::new();
        report.record_count(0, |count| DataQualityWarning::ImpactZonesWithoutDemographics { count });
        assert!(report.is_empty());

        report.record_count(3, |count| DataQualityWarning::ImpactZonesWithoutDemographics { count });
        assert_eq!(
            report.warnings,
            vec![DataQualityWarning::ImpactZonesWithoutDemographics { count: 3 }]
        );
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut a = QualityReport::new();
        a.record(DataQualityWarning::ZeroPopulation {
            category: "poverty".into(),
        });
        let mut b = QualityReport::new();
        b.record(DataQualityWarning::IsolatedZones {
            scenario: 1,
            count: 2,
        });
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert!(matches!(a.warnings[1], DataQualityWarning::IsolatedZones { .. }));
    }

    #[test]
    fn test_repeated_finding_recorded_once() {
        let mut a = QualityReport::new();
        let w = DataQualityWarning::ImpactZonesWithoutDemographics { count: 2 };
        a.record(w.clone());
        a.record(w.clone());
        let mut b = QualityReport::new();
        b.record(w);
        a.merge(b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let mut report = QualityReport::new();
        report.record(DataQualityWarning::ZeroPopulation {
            category: "poverty".into(),
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["warnings"][0]["kind"], "zero_population");
        assert_eq!(json["warnings"][0]["category"], "poverty");
    }

    #[test]
    fn test_reads_back_written_report() {
        let mut report = QualityReport::new();
        report.record(DataQualityWarning::SkippedMetric {
            scenario: 0,
            metric: "parks_c30".into(),
            reason: "no column".into(),
        });
        report.record(DataQualityWarning::MetricNotCompared {
            metric: "parks_c30".into(),
        });
        let json = serde_json::to_vec(&report).unwrap();
        let back: QualityReport = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.warnings, report.warnings);
        assert_eq!(back.generated_at, report.generated_at);
    }
}
