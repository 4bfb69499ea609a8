/// Bulk-import input: raw table rows, per-row validation, and reading
/// candidate rows from JSONL or JSON-array files.
use crate::metrics::{MetricField, MetricRange, MetricRanges, MetricSample, MetricValue, NumericKind};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};

/// One candidate row as it arrives from an editable table: a date and four
/// optionally-empty numeric text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawRow {
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "text_cell")]
    pub heart_rate: Option<String>,
    #[serde(default, deserialize_with = "text_cell")]
    pub glucose: Option<String>,
    #[serde(default, deserialize_with = "text_cell")]
    pub peak_flow: Option<String>,
    #[serde(default, deserialize_with = "text_cell")]
    pub hba1c: Option<String>,
}

/// Accept a string, a number or null for a cell. Any other JSON value is
/// kept as its text form so it fails numeric parsing like any bad cell.
fn text_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl RawRow {
    /// Build a row from a date and the heart rate, glucose, peak flow and
    /// HbA1c cells, in that order. Empty strings are empty cells.
    pub fn new(date: &str, cells: [&str; 4]) -> Self {
        let [heart_rate, glucose, peak_flow, hba1c] = cells.map(|c| Some(c.to_string()));
        Self {
            date: date.to_string(),
            heart_rate,
            glucose,
            peak_flow,
            hba1c,
        }
    }

    /// A row for `date` with every metric cell empty, as used by entry templates.
    pub fn blank(date: NaiveDate) -> Self {
        Self::new(&date.format("%Y-%m-%d").to_string(), ["", "", "", ""])
    }

    fn cell(&self, field: MetricField) -> Option<&str> {
        match field {
            MetricField::HeartRate => self.heart_rate.as_deref(),
            MetricField::Glucose => self.glucose.as_deref(),
            MetricField::PeakFlow => self.peak_flow.as_deref(),
            MetricField::Hba1c => self.hba1c.as_deref(),
        }
    }

    /// Parse every cell, then range-check every parsed value.
    ///
    /// A parse failure anywhere wins over a range failure elsewhere in the
    /// same row. On success the returned sample is ready to append whole.
    pub fn validate(&self, ranges: &MetricRanges) -> Result<MetricSample, RowValidationError> {
        let date = parse_date(&self.date)?;
        let heart_rate = parse_cell(MetricField::HeartRate, self.cell(MetricField::HeartRate))?;
        let glucose = parse_cell(MetricField::Glucose, self.cell(MetricField::Glucose))?;
        let peak_flow = parse_cell(MetricField::PeakFlow, self.cell(MetricField::PeakFlow))?;
        let hba1c = parse_cell(MetricField::Hba1c, self.cell(MetricField::Hba1c))?;

        let sample = MetricSample {
            date,
            heart_rate: heart_rate.and_then(MetricValue::as_int),
            glucose: glucose.and_then(MetricValue::as_int),
            peak_flow: peak_flow.map(MetricValue::as_f64),
            hba1c: hba1c.map(MetricValue::as_f64),
        };

        for field in MetricField::ALL {
            if let Some(value) = sample.value(field) {
                let range = ranges.get(field);
                if !range.contains(value.as_f64()) {
                    return Err(RowValidationError::OutOfRange {
                        field,
                        value,
                        range,
                    });
                }
            }
        }

        Ok(sample)
    }
}

/// Strict `YYYY-MM-DD`: chrono alone would also take `2025-1-5`.
fn parse_date(text: &str) -> Result<NaiveDate, RowValidationError> {
    let invalid = || RowValidationError::InvalidDate {
        value: text.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())
}

/// Empty and whitespace-only cells are "no value", not failures.
fn parse_cell(
    field: MetricField,
    cell: Option<&str>,
) -> Result<Option<MetricValue>, RowValidationError> {
    let text = match cell.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(t) => t,
    };

    let parsed = match field.kind() {
        NumericKind::Integer => parse_int(text).map(MetricValue::Int),
        NumericKind::Real => text.parse::<f64>().ok().map(MetricValue::Real),
    };

    parsed.map(Some).ok_or_else(|| RowValidationError::Parse {
        field,
        value: text.to_string(),
    })
}

/// Integers too wide for `i64` are still numbers; they saturate so the
/// range check rejects them instead of the parser.
fn parse_int(text: &str) -> Option<i64> {
    match text.parse::<i64>() {
        Ok(v) => Some(v),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Why a candidate row was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RowValidationError {
    /// The date cell is empty or not `YYYY-MM-DD`.
    InvalidDate { value: String },
    /// A non-empty cell is not a number of the field's kind.
    Parse { field: MetricField, value: String },
    /// A parsed value lies outside its inclusive range.
    OutOfRange {
        field: MetricField,
        value: MetricValue,
        range: MetricRange,
    },
}

impl RowValidationError {
    /// Parse failures get surfaced to the user; range rejections are quiet.
    pub fn is_parse_failure(&self) -> bool {
        !matches!(self, RowValidationError::OutOfRange { .. })
    }
}

impl std::fmt::Display for RowValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowValidationError::InvalidDate { value } => {
                write!(f, "invalid date \"{value}\" (expected YYYY-MM-DD)")
            }
            RowValidationError::Parse { field, value } => {
                let kind = match field.kind() {
                    NumericKind::Integer => "an integer",
                    NumericKind::Real => "a number",
                };
                write!(f, "{field} value \"{value}\" is not {kind}")
            }
            RowValidationError::OutOfRange {
                field,
                value,
                range,
            } => write!(
                f,
                "{field} value {value} is outside {}..={}",
                range.min, range.max
            ),
        }
    }
}

impl std::error::Error for RowValidationError {}

/// A rejected row: its 1-based position in the batch, its date text, and the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub row: usize,
    pub date: String,
    pub error: RowValidationError,
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {} ({}): {}", self.row, self.date, self.error)
    }
}

/// Outcome of one bulk ingest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<RowRejection>,
}

impl IngestReport {
    /// Rejections the user should be warned about (parse failures only).
    pub fn warnings(&self) -> impl Iterator<Item = &RowRejection> {
        self.rejected.iter().filter(|r| r.error.is_parse_failure())
    }
}

/// Read candidate rows from a file.
///
/// A file whose first non-whitespace byte is `[` is read as one JSON array
/// of row objects; anything else is JSONL with blank lines skipped.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, ReadError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ReadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_rows(&contents).map_err(|(line, source)| ReadError::Malformed {
        path: path.to_path_buf(),
        line,
        source,
    })
}

fn parse_rows(contents: &str) -> Result<Vec<RawRow>, (usize, serde_json::Error)> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents).map_err(|e| (e.line(), e));
    }

    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|e| (idx + 1, e))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Errors from reading an import file.
#[derive(Debug)]
pub enum ReadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Malformed {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ReadError::Malformed { path, line, source } => {
                write!(
                    f,
                    "malformed row at {}:{line}: {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io { source, .. } => Some(source),
            ReadError::Malformed { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn validate_accepts_partial_row() {
        let row = RawRow::new("2025-01-01", ["75", "90", "", ""]);
        let sample = row.validate(&MetricRanges::default()).unwrap();
        assert_eq!(sample.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(sample.heart_rate, Some(75));
        assert_eq!(sample.glucose, Some(90));
        assert_eq!(sample.peak_flow, None);
        assert_eq!(sample.hba1c, None);
    }

    #[test]
    fn validate_accepts_date_only_row() {
        let row = RawRow::new("2025-01-01", ["", "", "", ""]);
        assert!(row.validate(&MetricRanges::default()).is_ok());
    }

    #[test]
    fn validate_treats_missing_and_whitespace_cells_as_empty() {
        let row = RawRow {
            date: "2025-01-01".to_string(),
            heart_rate: None,
            glucose: Some("   ".to_string()),
            peak_flow: Some(" 350.5 ".to_string()),
            hba1c: None,
        };
        let sample = row.validate(&MetricRanges::default()).unwrap();
        assert_eq!(sample.glucose, None);
        assert_eq!(sample.peak_flow, Some(350.5));
    }

    #[test]
    fn validate_rejects_non_numeric_cell() {
        let row = RawRow::new("2025-01-03", ["abc", "90", "", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert_eq!(
            err,
            RowValidationError::Parse {
                field: MetricField::HeartRate,
                value: "abc".to_string(),
            }
        );
        assert!(err.is_parse_failure());
        assert_eq!(err.to_string(), "heart_rate value \"abc\" is not an integer");
    }

    #[test]
    fn validate_rejects_decimal_in_integer_cell() {
        let row = RawRow::new("2025-01-01", ["", "90.5", "", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert!(matches!(
            err,
            RowValidationError::Parse {
                field: MetricField::Glucose,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_value() {
        let row = RawRow::new("2025-01-02", ["999", "90", "", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert!(matches!(
            err,
            RowValidationError::OutOfRange {
                field: MetricField::HeartRate,
                value: MetricValue::Int(999),
                ..
            }
        ));
        assert!(!err.is_parse_failure());
        assert_eq!(err.to_string(), "heart_rate value 999 is outside 40..=140");
    }

    #[test]
    fn validate_rejects_overflowing_integer_as_out_of_range() {
        let row = RawRow::new("2025-01-01", ["99999999999999999999", "", "", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert!(matches!(
            err,
            RowValidationError::OutOfRange {
                field: MetricField::HeartRate,
                value: MetricValue::Int(i64::MAX),
                ..
            }
        ));
        assert!(!err.is_parse_failure());

        let row = RawRow::new("2025-01-01", ["", "-99999999999999999999", "", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert!(matches!(
            err,
            RowValidationError::OutOfRange {
                field: MetricField::Glucose,
                value: MetricValue::Int(i64::MIN),
                ..
            }
        ));
    }

    #[test]
    fn validate_overflow_does_not_hide_a_later_parse_failure() {
        let row = RawRow::new("2025-01-01", ["99999999999999999999", "abc", "", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert_eq!(
            err,
            RowValidationError::Parse {
                field: MetricField::Glucose,
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn validate_parse_failure_wins_over_range_failure() {
        // hba1c is out of range, but heart_rate fails to parse first
        let row = RawRow::new("2025-01-01", ["x", "", "", "15"]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn validate_rejects_nan_as_out_of_range() {
        let row = RawRow::new("2025-01-01", ["", "", "NaN", ""]);
        let err = row.validate(&MetricRanges::default()).unwrap_err();
        assert!(matches!(
            err,
            RowValidationError::OutOfRange {
                field: MetricField::PeakFlow,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_bad_date() {
        for date in [
            "",
            "2025-13-01",
            "01/02/2025",
            "yesterday",
            "2025-1-5",
            "2025-01-5",
        ] {
            let row = RawRow::new(date, ["75", "", "", ""]);
            let err = row.validate(&MetricRanges::default()).unwrap_err();
            assert!(
                matches!(err, RowValidationError::InvalidDate { .. }),
                "{date:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_accepts_padded_date_with_surrounding_whitespace() {
        let sample = RawRow::new(" 2025-01-05 ", ["", "", "", ""])
            .validate(&MetricRanges::default())
            .unwrap();
        assert_eq!(sample.date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn blank_row_has_empty_cells() {
        let row = RawRow::blank(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert_eq!(row.date, "2025-03-09");
        assert_eq!(row.heart_rate.as_deref(), Some(""));
        assert_eq!(row.hba1c.as_deref(), Some(""));
    }

    #[test]
    fn deserialize_accepts_strings_numbers_and_nulls() {
        let row: RawRow = serde_json::from_str(
            r#"{"date":"2025-01-01","heart_rate":72,"glucose":"95","peak_flow":null,"hba1c":5.5}"#,
        )
        .unwrap();
        assert_eq!(row.heart_rate.as_deref(), Some("72"));
        assert_eq!(row.glucose.as_deref(), Some("95"));
        assert_eq!(row.peak_flow, None);
        assert_eq!(row.hba1c.as_deref(), Some("5.5"));
    }

    #[test]
    fn deserialize_keeps_other_json_types_as_unparseable_text() {
        let row: RawRow =
            serde_json::from_str(r#"{"date":"2025-01-01","heart_rate":true}"#).unwrap();
        assert_eq!(row.heart_rate.as_deref(), Some("true"));
        assert!(row.validate(&MetricRanges::default()).is_err());
    }

    #[test]
    fn read_rows_jsonl_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "rows.jsonl",
            "{\"date\":\"2025-01-01\",\"heart_rate\":\"70\"}\n\n{\"date\":\"2025-01-02\"}\n",
        );
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].heart_rate.as_deref(), Some("70"));
        assert_eq!(rows[1].date, "2025-01-02");
        assert_eq!(rows[1].heart_rate, None);
    }

    #[test]
    fn read_rows_json_array() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "rows.json",
            r#"  [{"date":"2025-01-01","glucose":110},{"date":"2025-01-02","hba1c":"6.1"}]"#,
        );
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].glucose.as_deref(), Some("110"));
        assert_eq!(rows[1].hba1c.as_deref(), Some("6.1"));
    }

    #[test]
    fn read_rows_names_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "rows.jsonl",
            "{\"date\":\"2025-01-01\"}\n{broken\n",
        );
        let err = read_rows(&path).unwrap_err();
        assert!(matches!(err, ReadError::Malformed { line: 2, .. }));
        assert!(err.to_string().contains("rows.jsonl:2"));
    }

    #[test]
    fn read_rows_missing_file() {
        let err = read_rows(Path::new("/nonexistent/rows.jsonl")).unwrap_err();
        assert!(matches!(err, ReadError::Io { .. }));
    }

    #[test]
    fn report_warnings_only_include_parse_failures() {
        let report = IngestReport {
            accepted: 1,
            rejected: vec![
                RowRejection {
                    row: 2,
                    date: "2025-01-02".to_string(),
                    error: RowValidationError::OutOfRange {
                        field: MetricField::Glucose,
                        value: MetricValue::Int(500),
                        range: MetricRanges::default().glucose,
                    },
                },
                RowRejection {
                    row: 3,
                    date: "2025-01-03".to_string(),
                    error: RowValidationError::Parse {
                        field: MetricField::HeartRate,
                        value: "abc".to_string(),
                    },
                },
            ],
        };
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].to_string(),
            "row 3 (2025-01-03): heart_rate value \"abc\" is not an integer"
        );
    }
}
