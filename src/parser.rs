//! CSV decoding for the engine's tables.
//!
//! Every parser takes raw bytes (already fetched and decompressed) and the
//! zone-id width, and normalizes ids before anything is keyed on them.

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::analyzers::types::{ComparedTable, NamedColumn, SummaryRow, SummaryTable};
use crate::error::InputError;
use crate::metrics::{MetricColumn, MetricKey, MetricKind, MetricValues, MetricsTable};
use crate::table::{ImpactArea, TravelTime, TravelTimeMatrix, ZoneTable};
use crate::zone::ZoneId;

pub const ZONE_COLUMN: &str = "bg_id";

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes)
}

fn column(headers: &StringRecord, table: &str, name: &str) -> Result<usize, InputError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| InputError::MissingColumn {
            table: table.to_string(),
            column: name.to_string(),
        })
}

fn zone(table: &str, row: usize, raw: &str, width: usize) -> Result<ZoneId, InputError> {
    ZoneId::normalize(raw, width).ok_or_else(|| InputError::InvalidZoneId {
        table: table.to_string(),
        row,
        value: raw.to_string(),
    })
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("nan")
}

fn number(table: &str, row: usize, col: &str, raw: &str) -> Result<f64, InputError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(|| InputError::InvalidNumber {
            table: table.to_string(),
            row,
            column: col.to_string(),
            value: raw.to_string(),
        })
}

fn non_negative(table: &str, row: usize, col: &str, raw: &str) -> Result<f64, InputError> {
    let value = number(table, row, col, raw)?;
    if value < 0.0 {
        return Err(InputError::NegativeValue {
            table: table.to_string(),
            row,
            column: col.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Travel time cell: empty or NaN means the routing engine found no path.
fn travel_time(table: &str, row: usize, col: &str, raw: &str) -> Result<TravelTime, InputError> {
    if is_missing(raw) {
        return Ok(TravelTime::Unreachable);
    }
    Ok(TravelTime::Reachable(non_negative(table, row, col, raw)?))
}

/// Decodes a `from_id,to_id,travel_time` matrix. Rows missing either id are dropped.
pub fn parse_matrix(bytes: &[u8], width: usize) -> Result<TravelTimeMatrix, InputError> {
    const TABLE: &str = "matrix";
    let mut rdr = reader(bytes);
    let headers = rdr.headers()?.clone();
    let from_col = column(&headers, TABLE, "from_id")?;
    let to_col = column(&headers, TABLE, "to_id")?;
    let time_col = column(&headers, TABLE, "travel_time")?;

    let mut matrix = TravelTimeMatrix::new();
    let mut dropped = 0usize;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let (from, to) = (&record[from_col], &record[to_col]);
        if from.is_empty() || to.is_empty() {
            dropped += 1;
            continue;
        }
        matrix.push(
            zone(TABLE, row, from, width)?,
            zone(TABLE, row, to, width)?,
            travel_time(TABLE, row, "travel_time", &record[time_col])?,
        );
    }

    debug!(rows = matrix.len(), dropped, "Matrix parsed");
    Ok(matrix)
}

/// Decodes a `bg_id,<category>...` count table (opportunities or demographics).
///
/// Empty cells count as 0. Negative counts and repeated zones are rejected.
pub fn parse_zone_table(name: &str, bytes: &[u8], width: usize) -> Result<ZoneTable, InputError> {
    let mut rdr = reader(bytes);
    let headers = rdr.headers()?.clone();
    let id_col = column(&headers, name, ZONE_COLUMN)?;
    let value_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != id_col)
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut table = ZoneTable::new(name, value_cols.iter().map(|(_, h)| h.clone()).collect());
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let id = zone(name, row, &record[id_col], width)?;
        let values = value_cols
            .iter()
            .map(|(c, h)| {
                let raw = record.get(*c).unwrap_or("");
                if is_missing(raw) {
                    Ok(0.0)
                } else {
                    non_negative(name, row, h, raw)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !table.insert(id.clone(), values) {
            return Err(InputError::DuplicateZone {
                table: name.to_string(),
                zone: id.to_string(),
            });
        }
    }

    debug!(table = name, rows = table.len(), columns = table.columns().len(), "Zone table parsed");
    Ok(table)
}

/// Decodes the impact-area zone list from its `bg_id` column.
pub fn parse_impact_area(bytes: &[u8], width: usize) -> Result<ImpactArea, InputError> {
    const TABLE: &str = "impact_area";
    let mut rdr = reader(bytes);
    let headers = rdr.headers()?.clone();
    let id_col = column(&headers, TABLE, ZONE_COLUMN)?;

    rdr.records()
        .enumerate()
        .map(|(i, record)| {
            let record = record?;
            zone(TABLE, i + 1, &record[id_col], width)
        })
        .collect()
}

/// Rows keyed by zone, sorted, with duplicates rejected.
fn sorted_rows(
    table: &str,
    rdr: &mut csv::Reader<&[u8]>,
    id_col: usize,
    width: usize,
) -> Result<Vec<(ZoneId, StringRecord)>, InputError> {
    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        rows.push((zone(table, i + 1, &record[id_col], width)?, record));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(InputError::DuplicateZone {
            table: table.to_string(),
            zone: w[0].0.to_string(),
        });
    }
    Ok(rows)
}

/// Reads back a metrics table written by [`crate::output::write_metrics`].
///
/// Column kinds come from the `_c`/`_t` suffix of each header; columns that do
/// not name a metric are ignored.
pub fn parse_metrics(bytes: &[u8], width: usize) -> Result<MetricsTable, InputError> {
    const TABLE: &str = "metrics";
    let mut rdr = reader(bytes);
    let headers = rdr.headers()?.clone();
    let id_col = column(&headers, TABLE, ZONE_COLUMN)?;
    let rows = sorted_rows(TABLE, &mut rdr, id_col, width)?;

    let mut columns = Vec::new();
    for (c, name) in headers.iter().enumerate() {
        if c == id_col {
            continue;
        }
        let Some(key) = MetricKey::parse(name) else {
            debug!(column = name, "Ignoring non-metric column");
            continue;
        };
        let cells = rows
            .iter()
            .enumerate()
            .map(|(r, (_, rec))| (r + 1, rec.get(c).unwrap_or("")));
        let values = match key.kind {
            MetricKind::Cumulative => MetricValues::Cumulative(
                cells
                    .map(|(row, raw)| number(TABLE, row, name, raw))
                    .collect::<Result<_, _>>()?,
            ),
            MetricKind::TravelTime => MetricValues::TravelTime(
                cells
                    .map(|(row, raw)| travel_time(TABLE, row, name, raw))
                    .collect::<Result<_, _>>()?,
            ),
        };
        columns.push(MetricColumn { key, values });
    }

    Ok(MetricsTable {
        zones: rows.into_iter().map(|(z, _)| z).collect(),
        columns,
    })
}

/// Reads back a compared table written by [`crate::output::write_compared`].
pub fn parse_compared(bytes: &[u8], width: usize) -> Result<ComparedTable, InputError> {
    const TABLE: &str = "compared";
    let mut rdr = reader(bytes);
    let headers = rdr.headers()?.clone();
    let id_col = column(&headers, TABLE, ZONE_COLUMN)?;
    let rows = sorted_rows(TABLE, &mut rdr, id_col, width)?;

    let mut columns = Vec::new();
    for (c, name) in headers.iter().enumerate() {
        if c == id_col {
            continue;
        }
        let values = rows
            .iter()
            .enumerate()
            .map(|(r, (_, rec))| number(TABLE, r + 1, name, rec.get(c).unwrap_or("")))
            .collect::<Result<Vec<_>, _>>()?;
        columns.push(NamedColumn {
            name: name.to_string(),
            values,
        });
    }

    Ok(ComparedTable {
        zones: rows.into_iter().map(|(z, _)| z).collect(),
        columns,
    })
}

/// Reads back a summary table; `NaN` cells stay NaN.
pub fn parse_summary(bytes: &[u8]) -> Result<SummaryTable, InputError> {
    const TABLE: &str = "summary";
    let mut rdr = reader(bytes);
    let headers = rdr.headers()?.clone();
    let metric_col = column(&headers, TABLE, "metric")?;
    let categories: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != metric_col)
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let values = categories
            .iter()
            .map(|(c, h)| {
                let raw = record.get(*c).unwrap_or("");
                raw.parse::<f64>().map_err(|_| InputError::InvalidNumber {
                    table: TABLE.to_string(),
                    row: i + 1,
                    column: h.clone(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(SummaryRow {
            metric: record[metric_col].to_string(),
            values,
        });
    }

    Ok(SummaryTable {
        categories: categories.into_iter().map(|(_, h)| h).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matrix_with_missing_times() {
        let csv = "from_id,to_id,travel_time\n\
                   36061000100,36061000100,0\n\
                   36061000100,36061000200,\n\
                   36061000100,36061000300,NaN\n\
                   ,36061000300,4\n\
                   36061000200,36061000100,12.5\n";
        let m = parse_matrix(csv.as_bytes(), 12).unwrap();

        assert_eq!(m.len(), 4);
        let origin = ZoneId::normalize("036061000100", 12).unwrap();
        let rows = m.rows_from(&origin).unwrap();
        assert_eq!(rows[0].1, TravelTime::Reachable(0.0));
        assert_eq!(rows[1].1, TravelTime::Unreachable);
        assert_eq!(rows[2].1, TravelTime::Unreachable);
    }

    #[test]
    fn test_parse_matrix_requires_columns() {
        let err = parse_matrix(b"origin,destination,minutes\n1,2,3\n", 12).unwrap_err();
        assert!(matches!(err, InputError::MissingColumn { ref column, .. } if column == "from_id"));
    }

    #[test]
    fn test_parse_matrix_rejects_negative_time() {
        let err = parse_matrix(b"from_id,to_id,travel_time\n1,2,-3\n", 12).unwrap_err();
        assert!(matches!(err, InputError::NegativeValue { .. }));
    }

    #[test]
    fn test_parse_zone_table() {
        let csv = "bg_id,jobs,hospitals\n36061000100,10,\n036061000200,0,2\n";
        let t = parse_zone_table("opportunities", csv.as_bytes(), 12).unwrap();

        assert_eq!(t.columns(), &["jobs".to_string(), "hospitals".to_string()]);
        let a = ZoneId::normalize("36061000100", 12).unwrap();
        assert_eq!(t.row(&a), Some(&[10.0, 0.0][..]));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_parse_zone_table_rejects_duplicates_after_normalizing() {
        let csv = "bg_id,jobs\n36061000100,1\n036061000100,2\n";
        let err = parse_zone_table("opportunities", csv.as_bytes(), 12).unwrap_err();
        assert!(matches!(err, InputError::DuplicateZone { .. }));
    }

    #[test]
    fn test_parse_zone_table_rejects_bad_ids() {
        let csv = "bg_id,jobs\n1234567890123,1\n";
        let err = parse_zone_table("opportunities", csv.as_bytes(), 12).unwrap_err();
        assert!(matches!(err, InputError::InvalidZoneId { row: 1, .. }));
    }

    #[test]
    fn test_parse_impact_area() {
        let area = parse_impact_area(b"bg_id\n36061000100\n36061000200\n", 12).unwrap();
        assert_eq!(area.len(), 2);
        assert!(area.contains(&ZoneId::normalize("036061000200", 12).unwrap()));
    }

    #[test]
    fn test_parse_metrics() {
        let csv = "bg_id,jobs_c30,clinic_t1\n000000000002,4,\n000000000001,7,12\n";
        let m = parse_metrics(csv.as_bytes(), 12).unwrap();

        assert_eq!(m.zones[0].as_str(), "000000000001");
        assert_eq!(m.columns[0].values, MetricValues::Cumulative(vec![7.0, 4.0]));
        assert_eq!(
            m.columns[1].values,
            MetricValues::TravelTime(vec![TravelTime::Reachable(12.0), TravelTime::Unreachable])
        );
    }

    #[test]
    fn test_parse_compared() {
        let csv = "bg_id,jobs_c30_0,jobs_c30_1,jobs_c30_1-0\n1,2,5,3\n";
        let c = parse_compared(csv.as_bytes(), 12).unwrap();
        assert_eq!(c.columns.len(), 3);
        assert_eq!(c.column("jobs_c30_1-0").unwrap().values, vec![3.0]);
    }

    #[test]
    fn test_parse_summary_keeps_nan() {
        let s = parse_summary(b"metric,pop,empty\njobs_c30_1-0,17.5,NaN\n").unwrap();
        assert_eq!(s.categories, vec!["pop", "empty"]);
        assert_eq!(s.get("jobs_c30_1-0", "pop"), Some(17.5));
        assert!(s.get("jobs_c30_1-0", "empty").unwrap().is_nan());
    }
}
