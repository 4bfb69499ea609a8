/// Reports built from a session: latest metrics, a recent window for
/// heart rate and glucose, and per-field chart series.
///
/// Everything here reads the metrics log through its accessors. Gaps are
/// passed through as `null` in JSON and shown as `-` in text.
use crate::conditions::ConditionLog;
use crate::metrics::{LogState, MetricField, MetricValue, MetricsLog};
use crate::profile::Profile;
use crate::session::HealthSession;
use chrono::NaiveDate;
use serde::Serialize;

/// Fields summarised in the recent window.
const RECENT_FIELDS: [MetricField; 2] = [MetricField::HeartRate, MetricField::Glucose];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: Option<MetricValue>,
}

/// Dated values for one field, in append order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub field: MetricField,
    pub unit: &'static str,
    pub points: Vec<ChartPoint>,
}

/// Build a chart series for `field`: the full history, or the last `recent` samples.
pub fn chart_series(log: &MetricsLog, field: MetricField, recent: Option<usize>) -> ChartSeries {
    let (dates, values) = match recent {
        Some(n) => (log.recent_dates(n), log.recent(field, n)),
        None => (log.dates(), log.all(field)),
    };
    ChartSeries {
        field,
        unit: field.unit(),
        points: dates
            .iter()
            .zip(values)
            .map(|(date, value)| ChartPoint {
                date: *date,
                value: *value,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestMetrics {
    pub date: Option<NaiveDate>,
    pub heart_rate: Option<MetricValue>,
    pub glucose: Option<MetricValue>,
    pub peak_flow: Option<MetricValue>,
    pub hba1c: Option<MetricValue>,
}

impl LatestMetrics {
    pub fn from_log(log: &MetricsLog) -> Self {
        Self {
            date: log.latest_date(),
            heart_rate: log.latest(MetricField::HeartRate),
            glucose: log.latest(MetricField::Glucose),
            peak_flow: log.latest(MetricField::PeakFlow),
            hba1c: log.latest(MetricField::Hba1c),
        }
    }

    fn get(&self, field: MetricField) -> Option<MetricValue> {
        match field {
            MetricField::HeartRate => self.heart_rate,
            MetricField::Glucose => self.glucose,
            MetricField::PeakFlow => self.peak_flow,
            MetricField::Hba1c => self.hba1c,
        }
    }
}

/// Entry counts per chronic condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConditionCounts {
    pub diabetes: usize,
    pub hypertension: usize,
    pub asthma: usize,
}

impl ConditionCounts {
    pub fn from_log(log: &ConditionLog) -> Self {
        Self {
            diabetes: log.diabetes().len(),
            hypertension: log.hypertension().len(),
            asthma: log.asthma().len(),
        }
    }

    pub fn total(&self) -> usize {
        self.diabetes + self.hypertension + self.asthma
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub profile: Option<Profile>,
    pub state: LogState,
    pub samples: usize,
    pub latest: LatestMetrics,
    pub recent_window: usize,
    pub recent: Vec<ChartSeries>,
    pub conditions: ConditionCounts,
}

impl HealthReport {
    pub fn build(session: &HealthSession, recent_window: usize) -> Self {
        let log = session.metrics();
        Self {
            profile: session.profile().cloned(),
            state: log.state(),
            samples: log.len(),
            latest: LatestMetrics::from_log(log),
            recent_window,
            recent: RECENT_FIELDS
                .iter()
                .map(|f| chart_series(log, *f, Some(recent_window)))
                .collect(),
            conditions: ConditionCounts::from_log(session.conditions()),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::from("Health Report Summary\n");

        out.push_str("\nPatient Profile\n");
        match &self.profile {
            Some(profile) => {
                for (label, value) in profile.lines() {
                    out.push_str(&format!("  {label}: {value}\n"));
                }
            }
            None => out.push_str("  (no profile saved)\n"),
        }

        out.push_str(&format!("\nLatest Metrics ({} samples)\n", self.samples));
        let date = self
            .latest
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!("  Date: {date}\n"));
        for field in MetricField::ALL {
            let value = match self.latest.get(field) {
                Some(v) => format!("{v} {}", field.unit()),
                None => "N/A".to_string(),
            };
            out.push_str(&format!("  {}: {value}\n", field.label()));
        }

        out.push_str(&format!("\nRecent Metrics (last {})\n", self.recent_window));
        for series in &self.recent {
            let values: Vec<String> = series
                .points
                .iter()
                .map(|p| p.value.map_or_else(|| "-".to_string(), |v| v.to_string()))
                .collect();
            out.push_str(&format!(
                "  {}: [{}]\n",
                series.field.label(),
                values.join(", ")
            ));
        }

        if self.conditions.total() > 0 {
            out.push_str("\nCondition Entries\n");
            out.push_str(&format!("  Diabetes: {}\n", self.conditions.diabetes));
            out.push_str(&format!("  Hypertension: {}\n", self.conditions.hypertension));
            out.push_str(&format!("  Asthma: {}\n", self.conditions.asthma));
        }

        out
    }
}
