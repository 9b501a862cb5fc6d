//! Background job running the attendance alert pass.

use std::sync::Arc;

use domain::services::{AlertEngine, AlertPassError, Clock};
use tracing::info;

use super::scheduler::{Job, JobFrequency};

/// One wake of the alert scheduler: evaluates every rule against today's
/// assignments and records, and dispatches what qualifies.
pub struct AttendanceAlertsJob {
    engine: Arc<AlertEngine>,
    clock: Arc<dyn Clock>,
    interval_minutes: u64,
}

impl AttendanceAlertsJob {
    pub fn new(engine: Arc<AlertEngine>, clock: Arc<dyn Clock>, interval_minutes: u64) -> Self {
        Self {
            engine,
            clock,
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for AttendanceAlertsJob {
    fn name(&self) -> &'static str {
        "attendance_alerts"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), String> {
        match self.engine.run_pass(self.clock.now()).await {
            Ok(report) => {
                info!(
                    local_time = %report.local_time,
                    candidates = report.candidates,
                    sent = report.sent.len(),
                    failed = report.failed.len(),
                    "Alert pass finished"
                );
                Ok(())
            }
            // A manual pass is in flight; it covers this wake
            Err(AlertPassError::AlreadyRunning) => {
                info!("Alert pass already running, wake skipped");
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::models::{AlertType, TaskAssignment};
    use domain::services::{
        AlertRules, Collaborators, InMemoryStore, MockNotificationService, ServiceSettings,
        ShiftedClock, SystemClock,
    };
    use uuid::Uuid;

    fn job(store: Arc<InMemoryStore>) -> AttendanceAlertsJob {
        let deps = Collaborators::from_store(store, Arc::new(MockNotificationService::new()));
        let engine = AlertEngine::new(deps, AlertRules::default(), ServiceSettings::default());
        AttendanceAlertsJob::new(Arc::new(engine), Arc::new(SystemClock), 15)
    }

    #[test]
    fn test_job_frequency_follows_interval() {
        let job = job(Arc::new(InMemoryStore::new()));
        assert_eq!(job.name(), "attendance_alerts");
        assert_eq!(job.frequency(), JobFrequency::Minutes(15));
    }

    #[tokio::test]
    async fn test_empty_day_succeeds() {
        let job = job(Arc::new(InMemoryStore::new()));
        assert!(job.execute().await.is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_fails_the_wake() {
        let store = Arc::new(InMemoryStore::new());
        store.set_unavailable(true);

        let err = job(store).execute().await.unwrap_err();
        assert!(err.contains("load task assignments"));
    }

    #[tokio::test]
    async fn test_wake_evaluates_at_clock_time() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let store = Arc::new(InMemoryStore::new());
        store.insert_assignment(TaskAssignment {
            employee_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            work_date: start.date_naive(),
            supervisor_id: None,
            shift_start: None,
            shift_end: None,
        });
        let notifications = Arc::new(MockNotificationService::new());
        let deps = Collaborators::from_store(store, notifications.clone());
        let engine = AlertEngine::new(deps, AlertRules::default(), ServiceSettings::default());
        let job = AttendanceAlertsJob::new(
            Arc::new(engine),
            Arc::new(ShiftedClock::starting_at(start)),
            15,
        );

        job.execute().await.unwrap();
        assert_eq!(notifications.sent_of_type(AlertType::MissedLogin).len(), 1);
    }
}
