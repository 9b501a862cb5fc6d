//! Attendance state machine.
//!
//! Every transition runs the same pipeline: resolve the caller, resolve the
//! project, (clock-in only) require a task assignment, validate the
//! geofence, evaluate the guard, then write atomically through the store.
//! The store re-evaluates the guard as part of the write, so two concurrent
//! requests for the same key cannot both succeed.

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use shared::jwt::Role;

use super::geofence::{GeofenceCheck, GeofenceValidator, LocationFix};
use super::notification::CreateNotificationRequest;
use super::store::{bounded, StoreError};
use super::{Collaborators, ServiceSettings};
use crate::models::{
    AlertRequest, AlertType, AttendanceChange, AttendanceHistoryQuery, AttendanceHistoryResponse,
    AttendanceKey, AttendanceRecord, AttendanceRecordResponse, AttendanceStatusResponse, Employee,
    GeoError, GeoPoint, Project, PunchResponse, SessionState, SiteLocationRequest,
    TodayAttendanceResponse, Transition, TransitionRejection, ValidateGeofenceResponse,
};

pub const DEFAULT_HISTORY_LIMIT: i64 = 30;
pub const MAX_HISTORY_LIMIT: i64 = 366;

/// Authenticated caller context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
}

/// Attendance failures, one variant per rejection a client can act on.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{message}")]
    OutsideGeofence { distance: f64, message: String },

    #[error("Cannot {} while {state}: {reason}", .transition.describe())]
    InvalidTransition {
        transition: Transition,
        state: SessionState,
        reason: String,
    },

    #[error("Cannot {} without clocking in first", .transition.describe())]
    NotClockedIn { transition: Transition },

    #[error("No task assigned for project {project_id} on {date}")]
    NoTaskAssigned { project_id: Uuid, date: NaiveDate },

    #[error("Caller is not an active employee of this company")]
    UnauthorizedEmployee,

    #[error("{0}")]
    LookupFailure(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(#[from] GeoError),

    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        source: StoreError,
    },
}

impl AttendanceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::OutsideGeofence { .. } => "OUTSIDE_GEOFENCE",
            AttendanceError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AttendanceError::NotClockedIn { .. } => "NOT_CLOCKED_IN",
            AttendanceError::NoTaskAssigned { .. } => "NO_TASK_ASSIGNED",
            AttendanceError::UnauthorizedEmployee => "UNAUTHORIZED_EMPLOYEE",
            AttendanceError::LookupFailure(_) => "LOOKUP_FAILURE",
            AttendanceError::InvalidLocation(_) => "INVALID_LOCATION",
            AttendanceError::Store { .. } => "STORE_FAILURE",
        }
    }

    fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| AttendanceError::Store { operation, source }
    }
}

impl From<TransitionRejection> for AttendanceError {
    fn from(rejection: TransitionRejection) -> Self {
        match rejection {
            TransitionRejection::NotClockedIn { transition } => {
                AttendanceError::NotClockedIn { transition }
            }
            TransitionRejection::InvalidTransition {
                transition,
                state,
                reason,
            } => AttendanceError::InvalidTransition {
                transition,
                state,
                reason,
            },
        }
    }
}

/// Outcome of a successful transition.
#[derive(Debug, Clone)]
pub struct PunchOutcome {
    pub record: AttendanceRecord,
    pub check: GeofenceCheck,
}

/// Geofence-gated attendance transitions and reads.
pub struct AttendanceService {
    deps: Collaborators,
    validator: GeofenceValidator,
    settings: ServiceSettings,
}

impl AttendanceService {
    pub fn new(
        deps: Collaborators,
        validator: GeofenceValidator,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            deps,
            validator,
            settings,
        }
    }

    /// Local work date of an instant.
    pub fn work_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.settings.utc_offset).date_naive()
    }

    /// Geofence pre-check without any state change.
    pub async fn check_geofence(
        &self,
        caller: &Caller,
        request: &SiteLocationRequest,
    ) -> Result<ValidateGeofenceResponse, AttendanceError> {
        self.authorize(caller).await?;
        let project = self.load_project(caller, request.project_id).await?;
        let fix = location_fix(request)?;
        let check = self.validator.validate(&fix, &project.geofence);

        Ok(ValidateGeofenceResponse {
            inside_geofence: check.inside_geofence,
            distance: check.distance,
            can_proceed: check.is_valid,
            message: check.message,
            accuracy: check.accuracy,
        })
    }

    /// Applies one transition for the caller at `at`.
    pub async fn punch(
        &self,
        caller: &Caller,
        request: &SiteLocationRequest,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<PunchOutcome, AttendanceError> {
        let result = self.run_transition(caller, request, transition, at).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.code(),
        };
        counter!(
            "attendance_transitions_total",
            "action" => transition.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        result
    }

    /// The combined check-in/check-out endpoint.
    pub async fn submit(
        &self,
        caller: &Caller,
        request: &SiteLocationRequest,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<PunchResponse, AttendanceError> {
        let outcome = self.punch(caller, request, transition, at).await?;
        let mut response =
            PunchResponse::for_transition(transition, &outcome.record, outcome.check.inside_geofence);
        response.message = match transition {
            Transition::ClockIn => "Check-in submitted successfully".to_string(),
            Transition::ClockOut => "Check-out submitted successfully".to_string(),
            _ => response.message,
        };
        Ok(response)
    }

    pub async fn today(
        &self,
        caller: &Caller,
        project_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<TodayAttendanceResponse, AttendanceError> {
        self.authorize(caller).await?;
        let date = self.work_date(at);
        let record = self.todays_record(caller, project_id, date).await?;
        Ok(TodayAttendanceResponse::from_record(record.as_ref(), date))
    }

    pub async fn status(
        &self,
        caller: &Caller,
        project_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<AttendanceStatusResponse, AttendanceError> {
        self.authorize(caller).await?;
        let date = self.work_date(at);
        let record = self.todays_record(caller, project_id, date).await?;
        Ok(AttendanceStatusResponse::from_record(record.as_ref(), date, at))
    }

    pub async fn history(
        &self,
        caller: &Caller,
        query: &AttendanceHistoryQuery,
    ) -> Result<AttendanceHistoryResponse, AttendanceError> {
        self.authorize(caller).await?;
        let limit = query
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let records = bounded(
            self.settings.store_timeout,
            self.deps
                .records
                .history(caller.employee_id, query.project_id, limit),
        )
        .await
        .map_err(AttendanceError::store("load attendance history"))?;

        let records: Vec<AttendanceRecordResponse> =
            records.into_iter().map(Into::into).collect();
        Ok(AttendanceHistoryResponse {
            total: records.len(),
            records,
        })
    }

    async fn run_transition(
        &self,
        caller: &Caller,
        request: &SiteLocationRequest,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<PunchOutcome, AttendanceError> {
        let employee = self.authorize(caller).await?;
        let project = self.load_project(caller, request.project_id).await?;
        let date = self.work_date(at);
        let key = AttendanceKey::new(caller.employee_id, project.project_id, date);

        let assignment = bounded(
            self.settings.store_timeout,
            self.deps.assignments.find_assignment(&key),
        )
        .await
        .map_err(AttendanceError::store("load task assignment"))?;
        if transition == Transition::ClockIn && assignment.is_none() {
            return Err(AttendanceError::NoTaskAssigned {
                project_id: project.project_id,
                date,
            });
        }

        let record = bounded(self.settings.store_timeout, self.deps.records.find(&key))
            .await
            .map_err(AttendanceError::store("load attendance record"))?;

        let fix = location_fix(request)?;
        let check = self.validator.validate(&fix, &project.geofence);
        if !check.is_valid {
            let supervisor_id = assignment.and_then(|a| a.supervisor_id);
            self.handle_violation(
                &employee,
                &project,
                &key,
                record.as_ref(),
                transition,
                &check,
                supervisor_id,
            )
            .await;
            return Err(AttendanceError::OutsideGeofence {
                distance: check.distance,
                message: check.message,
            });
        }

        transition.check(record.as_ref(), at)?;

        let change = AttendanceChange {
            transition,
            at,
            location: fix.point,
            inside_geofence: check.inside_geofence,
            company_id: caller.company_id,
        };
        let updated = bounded(
            self.settings.store_timeout,
            self.deps.records.apply(&key, &change),
        )
        .await
        .map_err(AttendanceError::store("save attendance record"))?;

        let Some(record) = updated else {
            warn!(
                employee_id = %caller.employee_id,
                project_id = %project.project_id,
                transition = %transition,
                "Attendance record changed by a concurrent request"
            );
            return Err(AttendanceError::InvalidTransition {
                transition,
                state: record
                    .as_ref()
                    .map(AttendanceRecord::session_state)
                    .unwrap_or(SessionState::NotLoggedIn),
                reason: "the record was updated by another request".to_string(),
            });
        };

        info!(
            employee_id = %caller.employee_id,
            project_id = %project.project_id,
            transition = %transition,
            session = %record.session_state(),
            distance = check.distance,
            "Attendance transition applied"
        );

        Ok(PunchOutcome { record, check })
    }

    /// Side effects of a transition refused for being outside the fence.
    ///
    /// Failures here are logged and never change the caller's response.
    #[allow(clippy::too_many_arguments)]
    async fn handle_violation(
        &self,
        employee: &Employee,
        project: &Project,
        key: &AttendanceKey,
        record: Option<&AttendanceRecord>,
        transition: Transition,
        check: &GeofenceCheck,
        supervisor_id: Option<Uuid>,
    ) {
        warn!(
            employee_id = %employee.employee_id,
            project_id = %project.project_id,
            transition = %transition,
            distance = check.distance,
            "Attendance action outside project geofence"
        );

        let checked_in = record.map(AttendanceRecord::session_state) == Some(SessionState::CheckedIn);
        if transition == Transition::ClockOut && checked_in {
            if let Err(e) = bounded(
                self.settings.store_timeout,
                self.deps.records.mark_pending_checkout(key),
            )
            .await
            {
                warn!(employee_id = %employee.employee_id, error = %e, "Failed to flag pending checkout");
            }
        }

        let alert = AlertRequest::new(
            AlertType::GeofenceViolation,
            employee.employee_id,
            supervisor_id,
            project.project_id,
            format!(
                "{} tried to {} at {} outside the project geofence. {}",
                employee.display_name,
                transition.describe(),
                project.name,
                check.message
            ),
            serde_json::json!({
                "action": transition.as_str(),
                "workerName": employee.display_name,
                "projectName": project.name,
                "distance": check.distance,
                "radius": project.geofence.radius_meters,
                "date": key.work_date,
            }),
        );
        let request = CreateNotificationRequest::from_alert(&alert, &self.settings.language);

        match tokio::time::timeout(
            self.settings.notification_timeout,
            self.deps.notifications.create_notification(request),
        )
        .await
        {
            Ok(Ok(_)) => {
                counter!(
                    "attendance_alerts_total",
                    "alert_type" => AlertType::GeofenceViolation.as_str(),
                    "outcome" => "sent"
                )
                .increment(1);
            }
            Ok(Err(e)) => {
                warn!(employee_id = %employee.employee_id, error = %e, "Failed to dispatch geofence violation alert");
            }
            Err(_) => {
                warn!(employee_id = %employee.employee_id, "Geofence violation alert timed out");
            }
        }
    }

    /// Resolves the caller to an active employee of the company its token
    /// names.
    pub async fn authorize(&self, caller: &Caller) -> Result<Employee, AttendanceError> {
        bounded(
            self.settings.store_timeout,
            self.deps
                .employees
                .find_active_employee(caller.company_id, caller.employee_id),
        )
        .await
        .map_err(AttendanceError::store("resolve employee"))?
        .ok_or(AttendanceError::UnauthorizedEmployee)
    }

    async fn load_project(
        &self,
        caller: &Caller,
        project_id: Uuid,
    ) -> Result<Project, AttendanceError> {
        bounded(
            self.settings.store_timeout,
            self.deps.projects.find_project(project_id),
        )
        .await
        .map_err(AttendanceError::store("load project"))?
        .filter(|p| p.company_id == caller.company_id && p.active)
        .ok_or_else(|| AttendanceError::LookupFailure(format!("Project {} not found", project_id)))
    }

    async fn todays_record(
        &self,
        caller: &Caller,
        project_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        match project_id {
            Some(project_id) => {
                let key = AttendanceKey::new(caller.employee_id, project_id, date);
                bounded(self.settings.store_timeout, self.deps.records.find(&key))
                    .await
                    .map_err(AttendanceError::store("load attendance record"))
            }
            None => {
                let records = bounded(
                    self.settings.store_timeout,
                    self.deps.records.find_for_employee_on(caller.employee_id, date),
                )
                .await
                .map_err(AttendanceError::store("load attendance record"))?;
                Ok(records.into_iter().next())
            }
        }
    }
}

fn location_fix(request: &SiteLocationRequest) -> Result<LocationFix, GeoError> {
    let point = GeoPoint::new(request.latitude, request.longitude)?;
    Ok(LocationFix::new(point, request.accuracy))
}
