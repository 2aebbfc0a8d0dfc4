//! Analysis configuration.
//!
//! Stored as YAML next to the analysis inputs:
//! ```yaml
//! uid: ny-test
//! infinity_value: 1000
//! scenarios:
//!   - name: Baseline
//!     start_datetime: "2023-05-01 07:00"
//!     duration: 60
//!     transit_modes: [BUS]
//! opportunities:
//!   jobs: {method: cumulative, parameters: [30, 45], name: Jobs, unit: jobs}
//! ```
//!
//! The opportunity `method` string is resolved into [`AccessMethod`] here, once;
//! nothing downstream looks at the raw string again.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::zone::DEFAULT_ZONE_WIDTH;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How accessibility to one opportunity category is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AccessMethod {
    /// Opportunities reachable within each threshold (minutes).
    Cumulative { thresholds: Vec<u32> },
    /// Minutes needed to reach the nth opportunity, for each rank n.
    TravelTime { ranks: Vec<u32> },
}

impl AccessMethod {
    pub fn parameters(&self) -> &[u32] {
        match self {
            AccessMethod::Cumulative { thresholds } => thresholds,
            AccessMethod::TravelTime { ranks } => ranks,
        }
    }

    pub fn is_travel_time(&self) -> bool {
        matches!(self, AccessMethod::TravelTime { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunitySpec {
    /// Column name in the opportunity table.
    pub key: String,
    pub method: AccessMethod,
    pub display_name: String,
    pub unit: String,
}

/// Transit modes understood by the routing engine. Walking is always implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitMode {
    Transit,
    Air,
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableCar,
    Gondola,
    Funicular,
}

impl TransitMode {
    fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_uppercase().as_str() {
            "TRANSIT" => TransitMode::Transit,
            "AIR" => TransitMode::Air,
            "TRAM" => TransitMode::Tram,
            "SUBWAY" => TransitMode::Subway,
            "RAIL" => TransitMode::Rail,
            "BUS" => TransitMode::Bus,
            "FERRY" => TransitMode::Ferry,
            "CABLE_CAR" => TransitMode::CableCar,
            "GONDOLA" => TransitMode::Gondola,
            "FUNICULAR" => TransitMode::Funicular,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub name: String,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub transit_modes: Vec<TransitMode>,
}

impl Scenario {
    /// Departure window `[start, end)` the matrix was computed over.
    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start,
            self.start + Duration::minutes(i64::from(self.duration_minutes)),
        )
    }
}

/// Overrides for where inputs are read from. Each entry is a path or URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default)]
    pub matrices: Vec<String>,
    pub opportunities: Option<String>,
    pub demographics: Option<String>,
    pub impact_area: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    pub uid: String,
    pub verbosity: Option<String>,
    pub analyst: Option<String>,
    pub project: Option<String>,
    pub description: Option<String>,
    pub infinity_value: f64,
    pub max_time_walking: Option<u32>,
    pub zone_id_width: usize,
    pub scenarios: Vec<Scenario>,
    pub opportunities: Vec<OpportunitySpec>,
    /// Demographic categories to report; empty means every table column.
    pub demographics: Vec<String>,
    pub sources: Sources,
}

#[derive(Deserialize)]
struct RawConfig {
    uid: serde_yaml::Value,
    verbosity: Option<String>,
    analyst: Option<String>,
    project: Option<String>,
    description: Option<String>,
    infinity_value: i64,
    max_time_walking: Option<u32>,
    zone_id_width: Option<usize>,
    #[serde(default)]
    scenarios: Vec<RawScenario>,
    #[serde(default)]
    opportunities: serde_yaml::Mapping,
    #[serde(default)]
    demographics: serde_yaml::Mapping,
    #[serde(default)]
    sources: Sources,
}

#[derive(Deserialize)]
struct RawScenario {
    name: String,
    start_datetime: String,
    duration: u32,
    #[serde(default)]
    transit_modes: Vec<String>,
}

#[derive(Deserialize)]
struct RawOpportunity {
    method: String,
    parameters: Vec<i64>,
    name: Option<String>,
    unit: Option<String>,
}

impl AnalysisConfig {
    /// Loads and validates the config from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content)?;

        if raw.infinity_value <= 0 {
            return Err(ConfigError::InvalidInfinity(raw.infinity_value));
        }
        let zone_id_width = raw.zone_id_width.unwrap_or(DEFAULT_ZONE_WIDTH);
        if zone_id_width == 0 {
            return Err(ConfigError::InvalidZoneWidth);
        }
        if raw.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }

        let scenarios = raw
            .scenarios
            .into_iter()
            .map(parse_scenario)
            .collect::<Result<Vec<_>, _>>()?;

        let mut opportunities = Vec::with_capacity(raw.opportunities.len());
        for (key, value) in raw.opportunities {
            let key = yaml_key(&key);
            let raw_opp: RawOpportunity = serde_yaml::from_value(value)?;
            opportunities.push(parse_opportunity(key, raw_opp)?);
        }

        let demographics = raw.demographics.iter().map(|(k, _)| yaml_key(k)).collect();

        Ok(AnalysisConfig {
            uid: yaml_key(&raw.uid),
            verbosity: raw.verbosity,
            analyst: raw.analyst,
            project: raw.project,
            description: raw.description,
            infinity_value: raw.infinity_value as f64,
            max_time_walking: raw.max_time_walking,
            zone_id_width,
            scenarios,
            opportunities,
            demographics,
            sources: raw.sources,
        })
    }
}

fn yaml_key(v: &serde_yaml::Value) -> String {
    match v {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn parse_scenario(raw: RawScenario) -> Result<Scenario, ConfigError> {
    let start = NaiveDateTime::parse_from_str(raw.start_datetime.trim(), DATETIME_FORMAT).map_err(
        |_| ConfigError::InvalidDatetime {
            scenario: raw.name.clone(),
            value: raw.start_datetime.clone(),
        },
    )?;

    let transit_modes = raw
        .transit_modes
        .iter()
        .map(|m| {
            TransitMode::parse(m).ok_or_else(|| ConfigError::UnknownTransitMode {
                scenario: raw.name.clone(),
                mode: m.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Scenario {
        name: raw.name,
        start,
        duration_minutes: raw.duration,
        transit_modes,
    })
}

fn parse_opportunity(key: String, raw: RawOpportunity) -> Result<OpportunitySpec, ConfigError> {
    if raw.parameters.is_empty() {
        return Err(ConfigError::EmptyParameters { opportunity: key });
    }
    let mut params = Vec::with_capacity(raw.parameters.len());
    for &p in &raw.parameters {
        if p <= 0 || p > i64::from(u32::MAX) {
            return Err(ConfigError::InvalidParameter {
                opportunity: key,
                value: p,
            });
        }
        params.push(p as u32);
    }

    let method = match raw.method.as_str() {
        "cumulative" => AccessMethod::Cumulative { thresholds: params },
        "travel_time" => AccessMethod::TravelTime { ranks: params },
        other => {
            return Err(ConfigError::UnknownMethod {
                opportunity: key,
                method: other.to_string(),
            });
        }
    };

    // travel-time metrics are measured in minutes unless the config says otherwise
    let unit = match (raw.unit, &method) {
        (Some(u), _) => u,
        (None, AccessMethod::TravelTime { .. }) => "minutes".to_string(),
        (None, AccessMethod::Cumulative { .. }) => String::new(),
    };

    Ok(OpportunitySpec {
        display_name: raw.name.unwrap_or_else(|| key.clone()),
        key,
        method,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
uid: 42
infinity_value: 1000
scenarios:
  - name: Baseline
    start_datetime: "2023-05-01 07:00"
    duration: 60
    transit_modes: [BUS, subway]
  - name: Redesign
    start_datetime: "2023-05-01 07:00"
    duration: 60
opportunities:
  jobs:
    method: cumulative
    parameters: [45, 30]
    name: Jobs
    unit: jobs
  hospitals:
    method: travel_time
    parameters: [1, 3]
    name: Hospitals
    unit: min
demographics:
  total_pop: {name: Total}
  poverty: {name: Below poverty}
"#;

    #[test]
    fn test_parses_sample() {
        let cfg = AnalysisConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.uid, "42");
        assert_eq!(cfg.infinity_value, 1000.0);
        assert_eq!(cfg.zone_id_width, 12);
        assert_eq!(cfg.scenarios.len(), 2);
        assert_eq!(
            cfg.scenarios[0].transit_modes,
            vec![TransitMode::Bus, TransitMode::Subway]
        );

        // declaration order is preserved
        assert_eq!(cfg.opportunities[0].key, "jobs");
        assert_eq!(
            cfg.opportunities[0].method,
            AccessMethod::Cumulative {
                thresholds: vec![45, 30]
            }
        );
        assert_eq!(cfg.opportunities[1].unit, "min");
        assert_eq!(cfg.demographics, vec!["total_pop", "poverty"]);
    }

    #[test]
    fn test_unit_defaults() {
        let yaml = SAMPLE.replace("    unit: min\n", "").replace("    unit: jobs\n", "");
        let cfg = AnalysisConfig::from_yaml(&yaml).unwrap();
        assert_eq!(cfg.opportunities[0].unit, "");
        assert_eq!(cfg.opportunities[1].unit, "minutes");
    }

    #[test]
    fn test_scenario_window() {
        let cfg = AnalysisConfig::from_yaml(SAMPLE).unwrap();
        let (start, end) = cfg.scenarios[0].window();
        assert_eq!((end - start).num_minutes(), 60);
    }

    #[test]
    fn test_unknown_method_fails_fast() {
        let yaml = SAMPLE.replace("method: cumulative", "method: gravity");
        let err = AnalysisConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMethod { ref method, .. } if method == "gravity"));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let yaml = SAMPLE.replace("[45, 30]", "[45, 0]");
        assert!(matches!(
            AnalysisConfig::from_yaml(&yaml),
            Err(ConfigError::InvalidParameter { value: 0, .. })
        ));

        let yaml = SAMPLE.replace("[45, 30]", "[]");
        assert!(matches!(
            AnalysisConfig::from_yaml(&yaml),
            Err(ConfigError::EmptyParameters { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_scenarios() {
        let yaml = SAMPLE.replace("[BUS, subway]", "[HOVERCRAFT]");
        assert!(matches!(
            AnalysisConfig::from_yaml(&yaml),
            Err(ConfigError::UnknownTransitMode { .. })
        ));

        let yaml = SAMPLE.replacen("2023-05-01 07:00", "May 1st", 1);
        assert!(matches!(
            AnalysisConfig::from_yaml(&yaml),
            Err(ConfigError::InvalidDatetime { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_infinity() {
        let yaml = SAMPLE.replace("infinity_value: 1000", "infinity_value: 0");
        assert!(matches!(
            AnalysisConfig::from_yaml(&yaml),
            Err(ConfigError::InvalidInfinity(0))
        ));
    }
}
