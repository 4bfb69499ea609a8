/// Session-scoped health metrics log.
///
/// Keeps a date series and four metric series (heart rate, glucose, peak
/// flow, HbA1c) in lockstep: index `i` in every series is the same sample.
/// Rows enter only through [`MetricsLog::ingest`], which appends a row to
/// all five series or to none of them.
///
/// Ingestion takes `&mut self`, so a second ingest cannot start while one
/// is running on the same log. Nothing here blocks or allocates beyond the
/// batch being appended.
use crate::ingest::{IngestReport, RawRow, RowRejection};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The four tracked measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    HeartRate,
    Glucose,
    PeakFlow,
    Hba1c,
}

/// Whether a field's cells parse as integers or reals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Real,
}

impl MetricField {
    pub const ALL: [MetricField; 4] = [
        MetricField::HeartRate,
        MetricField::Glucose,
        MetricField::PeakFlow,
        MetricField::Hba1c,
    ];

    /// Stable snake_case name, used in config keys, JSON and URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricField::HeartRate => "heart_rate",
            MetricField::Glucose => "glucose",
            MetricField::PeakFlow => "peak_flow",
            MetricField::Hba1c => "hba1c",
        }
    }

    /// Human-readable label for reports.
    pub fn label(self) -> &'static str {
        match self {
            MetricField::HeartRate => "Heart Rate",
            MetricField::Glucose => "Blood Glucose",
            MetricField::PeakFlow => "Peak Flow",
            MetricField::Hba1c => "HbA1c",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricField::HeartRate => "bpm",
            MetricField::Glucose => "mg/dL",
            MetricField::PeakFlow => "L/min",
            MetricField::Hba1c => "%",
        }
    }

    pub fn kind(self) -> NumericKind {
        match self {
            MetricField::HeartRate | MetricField::Glucose => NumericKind::Integer,
            MetricField::PeakFlow | MetricField::Hba1c => NumericKind::Real,
        }
    }
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A metric name that is not one of [`MetricField::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl std::fmt::Display for UnknownField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown metric \"{}\" (expected heart_rate, glucose, peak_flow or hba1c)",
            self.0
        )
    }
}

impl std::error::Error for UnknownField {}

/// A parsed measurement. Serializes as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Real(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Int(v) => v as f64,
            MetricValue::Real(v) => v,
        }
    }

    /// The integer payload; `None` for reals.
    pub fn as_int(self) -> Option<i64> {
        match self {
            MetricValue::Int(v) => Some(v),
            MetricValue::Real(_) => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Real(v) => write!(f, "{v}"),
        }
    }
}

/// Inclusive `[min, max]` bound for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Physiological bounds for all four fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRanges {
    pub heart_rate: MetricRange,
    pub glucose: MetricRange,
    pub peak_flow: MetricRange,
    pub hba1c: MetricRange,
}

impl Default for MetricRanges {
    fn default() -> Self {
        Self {
            heart_rate: MetricRange::new(40.0, 140.0),
            glucose: MetricRange::new(50.0, 200.0),
            peak_flow: MetricRange::new(100.0, 800.0),
            hba1c: MetricRange::new(4.0, 12.0),
        }
    }
}

impl MetricRanges {
    pub fn get(&self, field: MetricField) -> MetricRange {
        match field {
            MetricField::HeartRate => self.heart_rate,
            MetricField::Glucose => self.glucose,
            MetricField::PeakFlow => self.peak_flow,
            MetricField::Hba1c => self.hba1c,
        }
    }
}

/// One validated observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub date: NaiveDate,
    pub heart_rate: Option<i64>,
    pub glucose: Option<i64>,
    pub peak_flow: Option<f64>,
    pub hba1c: Option<f64>,
}

impl MetricSample {
    pub fn value(&self, field: MetricField) -> Option<MetricValue> {
        match field {
            MetricField::HeartRate => self.heart_rate.map(MetricValue::Int),
            MetricField::Glucose => self.glucose.map(MetricValue::Int),
            MetricField::PeakFlow => self.peak_flow.map(MetricValue::Real),
            MetricField::Hba1c => self.hba1c.map(MetricValue::Real),
        }
    }
}

/// Lifecycle of a log: empty until the first accepted row, empty again after reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogState {
    Empty,
    Populated,
}

/// Append-only, session-owned store of health measurements.
#[derive(Debug, Clone, Default)]
pub struct MetricsLog {
    ranges: MetricRanges,
    dates: Vec<NaiveDate>,
    heart_rates: Vec<Option<MetricValue>>,
    glucose_levels: Vec<Option<MetricValue>>,
    peak_flow: Vec<Option<MetricValue>>,
    hba1c: Vec<Option<MetricValue>>,
}

impl MetricsLog {
    /// An empty log using the default physiological ranges.
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty log that validates against `ranges`.
    pub fn with_ranges(ranges: MetricRanges) -> Self {
        Self {
            ranges,
            ..Default::default()
        }
    }

    /// Validate `rows` in order and append every row that passes.
    ///
    /// A failing row is skipped whole and the batch carries on. Parse
    /// failures are logged at warn, range rejections at debug; both are
    /// returned in the report.
    pub fn ingest(&mut self, rows: &[RawRow]) -> IngestReport {
        let mut report = IngestReport::default();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 1;
            match row.validate(&self.ranges) {
                Ok(sample) => {
                    self.push(sample);
                    report.accepted += 1;
                }
                Err(error) => {
                    if error.is_parse_failure() {
                        tracing::warn!(
                            row = row_number,
                            date = %row.date,
                            error = %error,
                            "error processing row, skipping"
                        );
                    } else {
                        tracing::debug!(
                            row = row_number,
                            date = %row.date,
                            error = %error,
                            "row out of range, skipping"
                        );
                    }
                    report.rejected.push(RowRejection {
                        row: row_number,
                        date: row.date.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            total = self.len(),
            "bulk ingest complete"
        );
        report
    }

    fn push(&mut self, sample: MetricSample) {
        self.heart_rates.push(sample.value(MetricField::HeartRate));
        self.glucose_levels.push(sample.value(MetricField::Glucose));
        self.peak_flow.push(sample.value(MetricField::PeakFlow));
        self.hba1c.push(sample.value(MetricField::Hba1c));
        self.dates.push(sample.date);
    }

    /// Drop every sample. Ranges are kept.
    pub fn reset(&mut self) {
        self.dates.clear();
        self.heart_rates.clear();
        self.glucose_levels.clear();
        self.peak_flow.clear();
        self.hba1c.clear();
    }

    /// Number of samples (the common length of every series).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn state(&self) -> LogState {
        if self.is_empty() {
            LogState::Empty
        } else {
            LogState::Populated
        }
    }

    fn series(&self, field: MetricField) -> &[Option<MetricValue>] {
        match field {
            MetricField::HeartRate => &self.heart_rates,
            MetricField::Glucose => &self.glucose_levels,
            MetricField::PeakFlow => &self.peak_flow,
            MetricField::Hba1c => &self.hba1c,
        }
    }

    /// Most recent value of `field`. `None` when the log is empty or the
    /// last sample has no value for it.
    pub fn latest(&self, field: MetricField) -> Option<MetricValue> {
        self.series(field).last().copied().flatten()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// The last `n` entries of `field` in append order, gaps included.
    pub fn recent(&self, field: MetricField, n: usize) -> &[Option<MetricValue>] {
        let series = self.series(field);
        &series[series.len().saturating_sub(n)..]
    }

    /// Dates matching [`MetricsLog::recent`] for the same `n`.
    pub fn recent_dates(&self, n: usize) -> &[NaiveDate] {
        &self.dates[self.dates.len().saturating_sub(n)..]
    }

    /// Full history of `field`, gaps included.
    pub fn all(&self, field: MetricField) -> &[Option<MetricValue>] {
        self.series(field)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Row-oriented view rebuilt from the parallel series.
    pub fn samples(&self) -> impl Iterator<Item = MetricSample> + '_ {
        (0..self.len()).map(move |i| MetricSample {
            date: self.dates[i],
            heart_rate: self.heart_rates[i].and_then(MetricValue::as_int),
            glucose: self.glucose_levels[i].and_then(MetricValue::as_int),
            peak_flow: self.peak_flow[i].map(MetricValue::as_f64),
            hba1c: self.hba1c[i].map(MetricValue::as_f64),
        })
    }
}
