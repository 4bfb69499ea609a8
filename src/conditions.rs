/// Chronic condition logs: single glucose readings, blood-pressure readings,
/// and asthma episodes, each entered one at a time.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bounds for single entries.
pub const GLUCOSE_MG_DL: (u32, u32) = (40, 400);
pub const SYSTOLIC_MM_HG: (u32, u32) = (90, 200);
pub const DIASTOLIC_MM_HG: (u32, u32) = (60, 130);
pub const ASTHMA_SEVERITY: (u8, u8) = (1, 10);

/// One entry for one of the tracked conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum ConditionEntry {
    Diabetes {
        date: NaiveDate,
        glucose: u32,
    },
    Hypertension {
        date: NaiveDate,
        systolic: u32,
        diastolic: u32,
    },
    Asthma {
        date: NaiveDate,
        #[serde(default)]
        triggers: String,
        severity: u8,
    },
}

impl ConditionEntry {
    fn check(&self) -> Result<(), ConditionError> {
        match self {
            ConditionEntry::Diabetes { glucose, .. } => {
                within("glucose", *glucose, GLUCOSE_MG_DL)
            }
            ConditionEntry::Hypertension {
                systolic,
                diastolic,
                ..
            } => {
                within("systolic", *systolic, SYSTOLIC_MM_HG)?;
                within("diastolic", *diastolic, DIASTOLIC_MM_HG)
            }
            ConditionEntry::Asthma { severity, .. } => within(
                "severity",
                u32::from(*severity),
                (u32::from(ASTHMA_SEVERITY.0), u32::from(ASTHMA_SEVERITY.1)),
            ),
        }
    }
}

fn within(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), ConditionError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConditionError {
            field,
            value,
            min,
            max,
        })
    }
}

/// Per-condition history, in entry order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConditionLog {
    diabetes: Vec<ConditionEntry>,
    hypertension: Vec<ConditionEntry>,
    asthma: Vec<ConditionEntry>,
}

impl ConditionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append one entry.
    pub fn record(&mut self, entry: ConditionEntry) -> Result<(), ConditionError> {
        entry.check()?;
        tracing::debug!(entry = ?entry, "condition entry logged");
        match entry {
            ConditionEntry::Diabetes { .. } => self.diabetes.push(entry),
            ConditionEntry::Hypertension { .. } => self.hypertension.push(entry),
            ConditionEntry::Asthma { .. } => self.asthma.push(entry),
        }
        Ok(())
    }

    pub fn diabetes(&self) -> &[ConditionEntry] {
        &self.diabetes
    }

    pub fn hypertension(&self) -> &[ConditionEntry] {
        &self.hypertension
    }

    pub fn asthma(&self) -> &[ConditionEntry] {
        &self.asthma
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.diabetes.is_empty() && self.hypertension.is_empty() && self.asthma.is_empty()
    }

    pub fn clear(&mut self) {
        self.diabetes.clear();
        self.hypertension.clear();
        self.asthma.clear();
    }
}

/// An entry value outside its bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionError {
    pub field: &'static str,
    pub value: u32,
    pub min: u32,
    pub max: u32,
}

impl std::fmt::Display for ConditionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} must be {}..={}, got {}",
            self.field, self.min, self.max, self.value
        )
    }
}

impl std::error::Error for ConditionError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn records_entries_per_condition() {
        let mut log = ConditionLog::new();
        log.record(ConditionEntry::Diabetes {
            date: date(1),
            glucose: 120,
        })
        .unwrap();
        log.record(ConditionEntry::Hypertension {
            date: date(2),
            systolic: 130,
            diastolic: 85,
        })
        .unwrap();
        log.record(ConditionEntry::Asthma {
            date: date(3),
            triggers: "pollen".to_string(),
            severity: 4,
        })
        .unwrap();

        assert_eq!(log.diabetes().len(), 1);
        assert_eq!(log.hypertension().len(), 1);
        assert_eq!(log.asthma().len(), 1);
    }

    #[test]
    fn glucose_bounds_are_inclusive() {
        let mut log = ConditionLog::new();
        for glucose in [40, 400] {
            log.record(ConditionEntry::Diabetes {
                date: date(1),
                glucose,
            })
            .unwrap();
        }
        let err = log
            .record(ConditionEntry::Diabetes {
                date: date(1),
                glucose: 401,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "glucose must be 40..=400, got 401");
        assert_eq!(log.diabetes().len(), 2);
    }

    #[test]
    fn blood_pressure_checks_both_values() {
        let mut log = ConditionLog::new();
        let err = log
            .record(ConditionEntry::Hypertension {
                date: date(1),
                systolic: 120,
                diastolic: 140,
            })
            .unwrap_err();
        assert_eq!(err.field, "diastolic");
        assert!(log.hypertension().is_empty());
    }

    #[test]
    fn asthma_severity_must_be_one_to_ten() {
        let mut log = ConditionLog::new();
        assert!(log
            .record(ConditionEntry::Asthma {
                date: date(1),
                triggers: String::new(),
                severity: 0,
            })
            .is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn entries_deserialize_from_tagged_json() {
        let entry: ConditionEntry = serde_json::from_str(
            r#"{"condition":"hypertension","date":"2025-03-02","systolic":128,"diastolic":82}"#,
        )
        .unwrap();
        assert_eq!(
            entry,
            ConditionEntry::Hypertension {
                date: date(2),
                systolic: 128,
                diastolic: 82,
            }
        );
    }

    #[test]
    fn clear_empties_every_condition() {
        let mut log = ConditionLog::new();
        log.record(ConditionEntry::Diabetes {
            date: date(1),
            glucose: 100,
        })
        .unwrap();
        log.clear();
        assert!(log.is_empty());
    }
}
