//! Output formatting and persistence for result tables.
//!
//! Every file is rendered in memory, written to a temporary sibling and
//! renamed into place, so a failed stage never leaves half a table behind.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use csv::Writer;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::types::{ComparedTable, SummaryTable, UnreachableTable};
use crate::error::InputError;
use crate::metrics::{MetricValues, MetricsTable};
use crate::parser::ZONE_COLUMN;
use crate::table::TravelTime;
use crate::zone::ZoneId;

/// Prints a summary table to `out` using Rust's debug pretty-print format.
pub fn print_pretty(out: &mut impl Write, summary: &SummaryTable) -> Result<()> {
    writeln!(out, "{summary:#?}")?;
    Ok(())
}

/// Prints a summary table to `out` as pretty-printed JSON. NaN cells print
/// as `null`.
pub fn print_json(out: &mut impl Write, summary: &SummaryTable) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary)?;
    writeln!(out)?;
    Ok(())
}

/// Replaces `path` with `bytes` via a temporary sibling file.
pub fn write_whole(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Output written");
    Ok(())
}

fn write_csv(
    path: &Path,
    render: impl FnOnce(&mut Writer<Vec<u8>>) -> csv::Result<()>,
) -> Result<(), InputError> {
    let mut writer = Writer::from_writer(Vec::new());
    render(&mut writer)?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    write_whole(path, &bytes)?;
    Ok(())
}

fn cell(value: f64) -> String {
    value.to_string()
}

fn travel_cell(value: TravelTime) -> String {
    value.minutes().map(cell).unwrap_or_default()
}

/// `bg_id` then one column per metric; unreachable travel times are empty cells.
pub fn write_metrics(path: &Path, table: &MetricsTable) -> Result<(), InputError> {
    write_csv(path, |w| {
        let mut header = vec![ZONE_COLUMN.to_string()];
        header.extend(table.columns.iter().map(|c| c.key.to_string()));
        w.write_record(&header)?;

        for (r, zone) in table.zones.iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(zone.to_string());
            for column in &table.columns {
                record.push(match &column.values {
                    MetricValues::Cumulative(v) => cell(v[r]),
                    MetricValues::TravelTime(v) => travel_cell(v[r]),
                });
            }
            w.write_record(&record)?;
        }
        Ok(())
    })
}

pub fn write_compared(path: &Path, table: &ComparedTable) -> Result<(), InputError> {
    write_csv(path, |w| {
        let mut header = vec![ZONE_COLUMN.to_string()];
        header.extend(table.columns.iter().map(|c| c.name.clone()));
        w.write_record(&header)?;

        for (r, zone) in table.zones.iter().enumerate() {
            let mut record = vec![zone.to_string()];
            record.extend(table.columns.iter().map(|c| cell(c.values[r])));
            w.write_record(&record)?;
        }
        Ok(())
    })
}

/// `metric` then one column per category. Empty categories print as `NaN`.
pub fn write_summary(path: &Path, table: &SummaryTable) -> Result<(), InputError> {
    write_csv(path, |w| {
        let mut header = vec!["metric".to_string()];
        header.extend(table.categories.iter().cloned());
        w.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![row.metric.clone()];
            record.extend(row.values.iter().map(|&v| cell(v)));
            w.write_record(&record)?;
        }
        Ok(())
    })
}

pub fn write_unreachable(path: &Path, table: &UnreachableTable) -> Result<(), InputError> {
    write_csv(path, |w| {
        let mut header = vec!["scenario".to_string(), "metric".to_string()];
        header.extend(table.categories.iter().cloned());
        w.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![row.scenario.to_string(), row.metric.to_string()];
            record.extend(row.totals.iter().map(|&v| cell(v)));
            w.write_record(&record)?;
        }
        Ok(())
    })
}

/// Single-column `bg_id` list, as used by the validation reports.
pub fn write_zone_list<'a>(
    path: &Path,
    zones: impl IntoIterator<Item = &'a ZoneId>,
) -> Result<(), InputError> {
    write_csv(path, |w| {
        w.write_record([ZONE_COLUMN])?;
        for zone in zones {
            w.write_record([zone.as_str()])?;
        }
        Ok(())
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_whole(path, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{SummaryRow, UnreachableRow};
    use crate::metrics::{MetricColumn, MetricKey, MetricKind};

    fn z(s: &str) -> ZoneId {
        ZoneId::normalize(s, 12).unwrap()
    }

    #[test]
    fn test_print_writes_table() {
        let table = SummaryTable {
            categories: vec!["pop".into()],
            rows: vec![SummaryRow {
                metric: "jobs_c30_1-0".into(),
                values: vec![2.5],
            }],
        };

        let mut out = Vec::new();
        print_pretty(&mut out, &table).unwrap();
        let pretty = String::from_utf8(out).unwrap();
        assert!(pretty.contains("jobs_c30_1-0"));
        assert!(pretty.ends_with('\n'));

        let mut out = Vec::new();
        print_json(&mut out, &table).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["categories"][0], "pop");
        assert_eq!(json["rows"][0]["values"][0], 2.5);
    }

    #[test]
    fn test_write_metrics_blank_for_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics0.csv");
        let table = MetricsTable {
            zones: vec![z("1"), z("2")],
            columns: vec![
                MetricColumn {
                    key: MetricKey::new("jobs", MetricKind::Cumulative, 30),
                    values: MetricValues::Cumulative(vec![5.0, 0.5]),
                },
                MetricColumn {
                    key: MetricKey::new("clinic", MetricKind::TravelTime, 1),
                    values: MetricValues::TravelTime(vec![
                        TravelTime::Reachable(12.0),
                        TravelTime::Unreachable,
                    ]),
                },
            ],
        };
        write_metrics(&path, &table).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "bg_id,jobs_c30,clinic_t1\n000000000001,5,12\n000000000002,0.5,\n"
        );
        assert!(!dir.path().join("metrics0.csv.tmp").exists());
    }

    #[test]
    fn test_write_summary_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let table = SummaryTable {
            categories: vec!["pop".into(), "empty".into()],
            rows: vec![SummaryRow {
                metric: "jobs_c30_1-0".into(),
                values: vec![17.5, f64::NAN],
            }],
        };
        write_summary(&path, &table).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "metric,pop,empty\njobs_c30_1-0,17.5,NaN\n"
        );
    }

    #[test]
    fn test_write_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unreachable.csv");
        let table = UnreachableTable {
            categories: vec!["pop".into()],
            rows: vec![UnreachableRow {
                scenario: 1,
                metric: MetricKey::new("clinic", MetricKind::TravelTime, 3),
                totals: vec![250.0],
            }],
        };
        write_unreachable(&path, &table).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "scenario,metric,pop\n1,clinic_t3,250\n"
        );
    }

    #[test]
    fn test_write_zone_list_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation").join("missing_demographics.csv");
        write_zone_list(&path, &[z("7")]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "bg_id\n000000000007\n"
        );
    }

    #[test]
    fn test_rewrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &vec![1, 2, 3]).unwrap();
        write_json(&path, &vec![4]).unwrap();
        let back: Vec<i32> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, vec![4]);
    }
}
