//! Time-windowed attendance alerts.
//!
//! Every pass recomputes the qualifying conditions from today's assignments
//! and records; nothing remembers what was already sent. A condition that
//! still holds on the next pass is alerted again, and de-duplication is left
//! to notification dispatch.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::notification::CreateNotificationRequest;
use super::store::{bounded, StoreError};
use super::{Collaborators, ServiceSettings};
use crate::models::project::UNKNOWN_PROJECT_NAME;
use crate::models::{AlertRequest, AlertType, AttendanceRecord, SupervisorContact, TaskAssignment};

/// Name used in alert texts when the worker cannot be resolved.
const UNKNOWN_WORKER_NAME: &str = "Worker";

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// Business-hour constants of the alert rules, in local wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRules {
    /// Used when an assignment carries no shift start.
    pub shift_start: NaiveTime,
    /// Used when an assignment carries no shift end.
    pub shift_end: NaiveTime,
    pub missed_login_grace: Duration,
    pub missed_logout_grace: Duration,
    pub lunch_time: NaiveTime,
    /// How long before lunch the reminder window is centered.
    pub lunch_reminder_lead: Duration,
    /// At least the wake interval, or some scheduler phases never land a
    /// wake inside it. Equal to it for exactly one reminder per day.
    pub lunch_reminder_window: Duration,
    pub overtime_start: NaiveTime,
    /// Same constraint as the lunch reminder window.
    pub overtime_window: Duration,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            shift_start: clock(8, 0),
            shift_end: clock(17, 0),
            missed_login_grace: Duration::minutes(15),
            missed_logout_grace: Duration::minutes(30),
            lunch_time: clock(12, 0),
            lunch_reminder_lead: Duration::minutes(10),
            lunch_reminder_window: Duration::minutes(15),
            overtime_start: clock(18, 0),
            overtime_window: Duration::minutes(15),
        }
    }
}

impl AlertRules {
    /// Half-open interval in which the lunch reminder fires on `date`.
    pub fn lunch_reminder_window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let center = date.and_time(self.lunch_time) - self.lunch_reminder_lead;
        let start = center - self.lunch_reminder_window / 2;
        (start, start + self.lunch_reminder_window)
    }

    /// Half-open interval in which the overtime alert fires on `date`.
    pub fn overtime_window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.overtime_start);
        (start, start + self.overtime_window)
    }
}

/// A worker who qualifies for an alert in this pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertCandidate {
    pub alert_type: AlertType,
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub work_date: NaiveDate,
    /// The local clock time the rule is anchored on.
    pub reference_time: NaiveTime,
}

/// Evaluates the four alert rules at local time `now`.
///
/// Only assignments and records of `now`'s date are considered. At most one
/// candidate is returned per (alert type, employee, project).
pub fn evaluate(
    rules: &AlertRules,
    now: NaiveDateTime,
    assignments: &[TaskAssignment],
    records: &[AttendanceRecord],
) -> Vec<AlertCandidate> {
    let today = now.date();
    let assignments: Vec<&TaskAssignment> =
        assignments.iter().filter(|a| a.work_date == today).collect();
    let records: Vec<&AttendanceRecord> =
        records.iter().filter(|r| r.work_date == today).collect();

    let checked_in_today: HashSet<Uuid> = records
        .iter()
        .filter(|r| r.check_in.is_some())
        .map(|r| r.employee_id)
        .collect();

    let assignment_for = |record: &AttendanceRecord| {
        assignments
            .iter()
            .find(|a| a.employee_id == record.employee_id && a.project_id == record.project_id)
            .copied()
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut push = |candidate: AlertCandidate| {
        if seen.insert((candidate.alert_type, candidate.employee_id, candidate.project_id)) {
            candidates.push(candidate);
        }
    };

    for assignment in &assignments {
        let start = assignment.shift_start.unwrap_or(rules.shift_start);
        if now >= today.and_time(start) + rules.missed_login_grace
            && !checked_in_today.contains(&assignment.employee_id)
        {
            push(AlertCandidate {
                alert_type: AlertType::MissedLogin,
                employee_id: assignment.employee_id,
                project_id: assignment.project_id,
                supervisor_id: assignment.supervisor_id,
                work_date: today,
                reference_time: start,
            });
        }
    }

    let (lunch_from, lunch_until) = rules.lunch_reminder_window_on(today);
    let (overtime_from, overtime_until) = rules.overtime_window_on(today);

    for &record in records.iter().filter(|r| r.is_open()) {
        let assignment = assignment_for(record);
        let supervisor_id = assignment.and_then(|a| a.supervisor_id);
        let candidate = |alert_type, reference_time| AlertCandidate {
            alert_type,
            employee_id: record.employee_id,
            project_id: record.project_id,
            supervisor_id,
            work_date: today,
            reference_time,
        };

        let end = assignment
            .and_then(|a| a.shift_end)
            .unwrap_or(rules.shift_end);
        if now >= today.and_time(end) + rules.missed_logout_grace {
            push(candidate(AlertType::MissedLogout, end));
        }

        if record.lunch_start_time.is_none() && now >= lunch_from && now < lunch_until {
            push(candidate(AlertType::LunchBreakReminder, rules.lunch_time));
        }

        if now >= overtime_from && now < overtime_until {
            push(candidate(AlertType::OvertimeStart, rules.overtime_start));
        }
    }

    candidates
}

#[derive(Debug, Error)]
pub enum AlertPassError {
    #[error("an alert pass is already running")]
    AlreadyRunning,

    #[error("{operation} failed: {source}")]
    Load {
        operation: &'static str,
        source: StoreError,
    },
}

/// One alert attempted in a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOutcome {
    pub alert_type: AlertType,
    pub worker_id: Uuid,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one alert pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPassReport {
    pub evaluated_at: DateTime<Utc>,
    pub local_time: NaiveDateTime,
    /// Set when the pass only covered one company.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub candidates: usize,
    pub sent: Vec<AlertOutcome>,
    pub failed: Vec<AlertOutcome>,
}

/// Runs alert passes against the collaborators. Passes never overlap.
pub struct AlertEngine {
    deps: Collaborators,
    rules: AlertRules,
    settings: ServiceSettings,
    pass_lock: Mutex<()>,
}

impl AlertEngine {
    pub fn new(deps: Collaborators, rules: AlertRules, settings: ServiceSettings) -> Self {
        Self {
            deps,
            rules,
            settings,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn rules(&self) -> &AlertRules {
        &self.rules
    }

    /// Runs one pass at `now` over every company.
    ///
    /// Fails with [`AlertPassError::AlreadyRunning`] instead of waiting when
    /// another pass is in flight. Per-worker failures are reported in the
    /// returned report and never abort the pass.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<AlertPassReport, AlertPassError> {
        self.run(now, None).await
    }

    /// Runs one pass at `now` over the assignments and records of one
    /// company. Assignments on projects of other companies, or on projects
    /// that cannot be found, are left to the scheduled pass.
    pub async fn run_pass_for_company(
        &self,
        now: DateTime<Utc>,
        company_id: Uuid,
    ) -> Result<AlertPassReport, AlertPassError> {
        self.run(now, Some(company_id)).await
    }

    async fn run(
        &self,
        now: DateTime<Utc>,
        company_id: Option<Uuid>,
    ) -> Result<AlertPassReport, AlertPassError> {
        let _guard = self
            .pass_lock
            .try_lock()
            .map_err(|_| AlertPassError::AlreadyRunning)?;

        let local_time = now.with_timezone(&self.settings.utc_offset).naive_local();
        let today = local_time.date();

        let assignments = bounded(
            self.settings.store_timeout,
            self.deps.assignments.list_for_date(today),
        )
        .await
        .map_err(|source| AlertPassError::Load {
            operation: "load task assignments",
            source,
        })?;
        let records = bounded(
            self.settings.store_timeout,
            self.deps.records.list_for_date(today),
        )
        .await
        .map_err(|source| AlertPassError::Load {
            operation: "load attendance records",
            source,
        })?;

        let (assignments, records) = match company_id {
            Some(company_id) => self.scope_to_company(company_id, assignments, records).await?,
            None => (assignments, records),
        };

        let candidates = evaluate(&self.rules, local_time, &assignments, &records);
        debug!(
            local_time = %local_time,
            assignments = assignments.len(),
            records = records.len(),
            candidates = candidates.len(),
            "Evaluated alert rules"
        );

        let mut report = AlertPassReport {
            evaluated_at: now,
            local_time,
            company_id,
            candidates: candidates.len(),
            sent: Vec::new(),
            failed: Vec::new(),
        };

        for candidate in candidates {
            let mut outcome = AlertOutcome {
                alert_type: candidate.alert_type,
                worker_id: candidate.employee_id,
                project_id: candidate.project_id,
                error: None,
            };
            match self.dispatch(&candidate).await {
                Ok(()) => {
                    counter!(
                        "attendance_alerts_total",
                        "alert_type" => candidate.alert_type.as_str(),
                        "outcome" => "sent"
                    )
                    .increment(1);
                    report.sent.push(outcome);
                }
                Err(e) => {
                    warn!(
                        alert_type = %candidate.alert_type,
                        employee_id = %candidate.employee_id,
                        project_id = %candidate.project_id,
                        error = %e,
                        "Failed to dispatch attendance alert"
                    );
                    counter!(
                        "attendance_alerts_total",
                        "alert_type" => candidate.alert_type.as_str(),
                        "outcome" => "failed"
                    )
                    .increment(1);
                    outcome.error = Some(e);
                    report.failed.push(outcome);
                }
            }
        }

        if report.failed.is_empty() {
            info!(
                local_time = %local_time,
                sent = report.sent.len(),
                "Alert pass completed"
            );
        } else {
            error!(
                local_time = %local_time,
                sent = report.sent.len(),
                failed = report.failed.len(),
                "Alert pass completed with failures"
            );
        }

        Ok(report)
    }

    async fn scope_to_company(
        &self,
        company_id: Uuid,
        assignments: Vec<TaskAssignment>,
        records: Vec<AttendanceRecord>,
    ) -> Result<(Vec<TaskAssignment>, Vec<AttendanceRecord>), AlertPassError> {
        let project_ids: HashSet<Uuid> = assignments.iter().map(|a| a.project_id).collect();

        let mut own_projects = HashSet::new();
        for project_id in project_ids {
            let project = bounded(
                self.settings.store_timeout,
                self.deps.projects.find_project(project_id),
            )
            .await
            .map_err(|source| AlertPassError::Load {
                operation: "load projects",
                source,
            })?;
            if project.is_some_and(|p| p.company_id == company_id) {
                own_projects.insert(project_id);
            }
        }

        let assignments = assignments
            .into_iter()
            .filter(|a| own_projects.contains(&a.project_id))
            .collect();
        let records = records
            .into_iter()
            .filter(|r| r.company_id == company_id)
            .collect();
        Ok((assignments, records))
    }

    async fn dispatch(&self, candidate: &AlertCandidate) -> Result<(), String> {
        let supervisor = self.supervisor_contact(candidate.supervisor_id).await;
        let project_name = self.project_name(candidate.project_id).await;
        let worker_name = self.worker_name(candidate.employee_id).await;
        let time = candidate.reference_time.format("%H:%M").to_string();

        let message = match candidate.alert_type {
            AlertType::MissedLogin => format!(
                "{} has not clocked in at {} (shift started {})",
                worker_name, project_name, time
            ),
            AlertType::MissedLogout => format!(
                "{} has not clocked out at {} (shift ended {})",
                worker_name, project_name, time
            ),
            AlertType::LunchBreakReminder => format!(
                "Lunch break starts at {}. Remember to record your lunch break at {}",
                time, project_name
            ),
            AlertType::OvertimeStart => format!(
                "{} is working overtime at {} (past {})",
                worker_name, project_name, time
            ),
            AlertType::GeofenceViolation => format!(
                "{} is outside the geofence of {}",
                worker_name, project_name
            ),
        };

        let alert = AlertRequest::new(
            candidate.alert_type,
            candidate.employee_id,
            candidate.supervisor_id,
            candidate.project_id,
            message,
            serde_json::json!({
                "workerName": worker_name,
                "projectName": project_name,
                "date": candidate.work_date,
                "scheduledTime": time,
                "supervisor": supervisor,
            }),
        );
        let request = CreateNotificationRequest::from_alert(&alert, &self.settings.language);

        match tokio::time::timeout(
            self.settings.notification_timeout,
            self.deps.notifications.create_notification(request),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "notification dispatch timed out after {:?}",
                self.settings.notification_timeout
            )),
        }
    }

    /// Resolves the supervisor, or a placeholder when that is not possible.
    async fn supervisor_contact(&self, supervisor_id: Option<Uuid>) -> SupervisorContact {
        let Some(id) = supervisor_id else {
            return SupervisorContact::placeholder(None);
        };
        match bounded(self.settings.store_timeout, self.deps.employees.find_employee(id)).await {
            Ok(Some(employee)) => SupervisorContact::from(employee),
            Ok(None) => {
                debug!(supervisor_id = %id, "Supervisor not found, using placeholder");
                SupervisorContact::placeholder(supervisor_id)
            }
            Err(e) => {
                warn!(supervisor_id = %id, error = %e, "Supervisor lookup failed, using placeholder");
                SupervisorContact::placeholder(supervisor_id)
            }
        }
    }

    async fn project_name(&self, project_id: Uuid) -> String {
        match bounded(
            self.settings.store_timeout,
            self.deps.projects.find_project(project_id),
        )
        .await
        {
            Ok(Some(project)) => project.name,
            Ok(None) => UNKNOWN_PROJECT_NAME.to_string(),
            Err(e) => {
                warn!(project_id = %project_id, error = %e, "Project lookup failed, using placeholder");
                UNKNOWN_PROJECT_NAME.to_string()
            }
        }
    }

    async fn worker_name(&self, employee_id: Uuid) -> String {
        match bounded(
            self.settings.store_timeout,
            self.deps.employees.find_employee(employee_id),
        )
        .await
        {
            Ok(Some(employee)) => employee.display_name,
            _ => UNKNOWN_WORKER_NAME.to_string(),
        }
    }
}
