/// One interactive session: profile, metrics log, and condition logs.
///
/// Everything here lives only as long as the session value. There is no
/// shared or global state; callers that want several sessions hold several
/// `HealthSession`s.
use crate::conditions::{ConditionEntry, ConditionError, ConditionLog};
use crate::ingest::{IngestReport, RawRow};
use crate::metrics::{MetricRanges, MetricsLog};
use crate::profile::{Profile, ProfileError, ProfileInput};

#[derive(Debug, Clone, Default)]
pub struct HealthSession {
    profile: Option<Profile>,
    metrics: MetricsLog,
    conditions: ConditionLog,
}

impl HealthSession {
    /// A fresh session whose metrics log validates against `ranges`.
    pub fn new(ranges: MetricRanges) -> Self {
        Self {
            profile: None,
            metrics: MetricsLog::with_ranges(ranges),
            conditions: ConditionLog::new(),
        }
    }

    /// Validate and store the profile, replacing any previous one.
    pub fn save_profile(&mut self, input: ProfileInput) -> Result<&Profile, ProfileError> {
        let profile = Profile::try_from(input)?;
        tracing::info!(name = %profile.name, bmi = profile.bmi, "profile saved");
        Ok(&*self.profile.insert(profile))
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Bulk-ingest rows into the metrics log.
    pub fn ingest(&mut self, rows: &[RawRow]) -> IngestReport {
        self.metrics.ingest(rows)
    }

    pub fn metrics(&self) -> &MetricsLog {
        &self.metrics
    }

    pub fn record_condition(&mut self, entry: ConditionEntry) -> Result<(), ConditionError> {
        self.conditions.record(entry)
    }

    pub fn conditions(&self) -> &ConditionLog {
        &self.conditions
    }

    /// Clear the profile, the metrics log, and every condition log.
    pub fn reset(&mut self) {
        self.profile = None;
        self.metrics.reset();
        self.conditions.clear();
        tracing::info!("session reset");
    }
}
