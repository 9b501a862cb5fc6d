//! Attendance record domain model and session state machine.
//!
//! The session state of a worker is never stored. It is derived from which
//! timestamps are populated on the day's record, so every endpoint that
//! reports a session goes through [`derive_session`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::geofence::GeoPoint;

/// Natural key of an attendance record: one per employee, project and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceKey {
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub work_date: NaiveDate,
}

impl AttendanceKey {
    pub fn new(employee_id: Uuid, project_id: Uuid, work_date: NaiveDate) -> Self {
        Self {
            employee_id,
            project_id,
            work_date,
        }
    }
}

/// Derived attendance state for one worker/project/day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    NotLoggedIn,
    CheckedIn,
    OnLunch,
    CheckedOut,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NotLoggedIn => "NOT_LOGGED_IN",
            SessionState::CheckedIn => "CHECKED_IN",
            SessionState::OnLunch => "ON_LUNCH",
            SessionState::CheckedOut => "CHECKED_OUT",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the session state from the record's timestamp fields.
///
/// Checked in order: checkout, open lunch, check-in.
pub fn derive_session(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    lunch_start_time: Option<DateTime<Utc>>,
    lunch_end_time: Option<DateTime<Utc>>,
) -> SessionState {
    if check_out.is_some() {
        SessionState::CheckedOut
    } else if lunch_start_time.is_some() && lunch_end_time.is_none() {
        SessionState::OnLunch
    } else if check_in.is_some() {
        SessionState::CheckedIn
    } else {
        SessionState::NotLoggedIn
    }
}

/// An attendance action requested by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    ClockIn,
    LunchStart,
    LunchEnd,
    ClockOut,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::ClockIn => "clock_in",
            Transition::LunchStart => "lunch_start",
            Transition::LunchEnd => "lunch_end",
            Transition::ClockOut => "clock_out",
        }
    }

    /// Human phrasing used in rejection messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Transition::ClockIn => "clock in",
            Transition::LunchStart => "start lunch",
            Transition::LunchEnd => "end lunch",
            Transition::ClockOut => "clock out",
        }
    }

    /// State reached when the transition succeeds.
    pub fn target(&self) -> SessionState {
        match self {
            Transition::ClockIn | Transition::LunchEnd => SessionState::CheckedIn,
            Transition::LunchStart => SessionState::OnLunch,
            Transition::ClockOut => SessionState::CheckedOut,
        }
    }

    /// Checks whether the transition may be applied to today's record at `at`.
    ///
    /// `record` is `None` when no record exists yet for the natural key.
    pub fn check(
        &self,
        record: Option<&AttendanceRecord>,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionRejection> {
        let state = record
            .map(AttendanceRecord::session_state)
            .unwrap_or(SessionState::NotLoggedIn);

        let invalid = |reason: &str| TransitionRejection::InvalidTransition {
            transition: *self,
            state,
            reason: reason.to_string(),
        };

        match (self, state) {
            (Transition::ClockIn, SessionState::NotLoggedIn) => Ok(()),
            (Transition::ClockIn, _) => Err(invalid("already clocked in today")),

            (_, SessionState::NotLoggedIn) => Err(TransitionRejection::NotClockedIn {
                transition: *self,
            }),

            (Transition::LunchStart, SessionState::CheckedIn) => match record {
                Some(r) if r.lunch_start_time.is_some() => {
                    Err(invalid("lunch break already taken today"))
                }
                Some(r) if r.check_in.is_some_and(|ci| at < ci) => {
                    Err(invalid("lunch cannot start before check-in"))
                }
                _ => Ok(()),
            },
            (Transition::LunchStart, SessionState::OnLunch) => {
                Err(invalid("lunch break already in progress"))
            }

            (Transition::LunchEnd, SessionState::OnLunch) => match record {
                Some(r) if r.lunch_start_time.is_some_and(|ls| at <= ls) => {
                    Err(invalid("lunch end must be after lunch start"))
                }
                _ => Ok(()),
            },
            (Transition::LunchEnd, SessionState::CheckedIn) => {
                Err(invalid("no lunch break in progress"))
            }

            (Transition::ClockOut, SessionState::CheckedIn) => match record {
                Some(r) if r.check_in.is_some_and(|ci| at <= ci) => {
                    Err(invalid("check-out must be after check-in"))
                }
                _ => Ok(()),
            },
            (Transition::ClockOut, SessionState::OnLunch) => {
                Err(invalid("end the lunch break before clocking out"))
            }

            (_, SessionState::CheckedOut) => Err(invalid("already clocked out today")),
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition guard refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The action requires a check-in that does not exist today.
    NotClockedIn { transition: Transition },
    /// Any other guard violation.
    InvalidTransition {
        transition: Transition,
        state: SessionState,
        reason: String,
    },
}

/// A guarded change to apply to the record identified by an [`AttendanceKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceChange {
    pub transition: Transition,
    pub at: DateTime<Utc>,
    pub location: GeoPoint,
    pub inside_geofence: bool,
    pub company_id: Uuid,
}

/// One worker's attendance on one project for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub record_id: Uuid,
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub work_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub lunch_start_time: Option<DateTime<Utc>>,
    pub lunch_end_time: Option<DateTime<Utc>>,
    pub check_in_location: Option<GeoPoint>,
    pub check_out_location: Option<GeoPoint>,
    pub inside_geofence_at_checkin: bool,
    pub inside_geofence_at_checkout: bool,
    pub pending_checkout: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// An empty record for the key, as created by the first check-in of the day.
    pub fn empty(key: &AttendanceKey, company_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            employee_id: key.employee_id,
            project_id: key.project_id,
            company_id,
            work_date: key.work_date,
            check_in: None,
            check_out: None,
            lunch_start_time: None,
            lunch_end_time: None,
            check_in_location: None,
            check_out_location: None,
            inside_geofence_at_checkin: false,
            inside_geofence_at_checkout: false,
            pending_checkout: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(self.employee_id, self.project_id, self.work_date)
    }

    pub fn session_state(&self) -> SessionState {
        derive_session(
            self.check_in,
            self.check_out,
            self.lunch_start_time,
            self.lunch_end_time,
        )
    }

    /// Checked in and not yet checked out (on lunch or working).
    pub fn is_open(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_none()
    }

    /// Applies a change whose guard has already passed.
    pub fn apply(&mut self, change: &AttendanceChange) {
        match change.transition {
            Transition::ClockIn => {
                self.check_in = Some(change.at);
                self.check_in_location = Some(change.location);
                self.inside_geofence_at_checkin = change.inside_geofence;
            }
            Transition::LunchStart => self.lunch_start_time = Some(change.at),
            Transition::LunchEnd => self.lunch_end_time = Some(change.at),
            Transition::ClockOut => {
                self.check_out = Some(change.at);
                self.check_out_location = Some(change.location);
                self.inside_geofence_at_checkout = change.inside_geofence;
                self.pending_checkout = false;
            }
        }
        self.updated_at = change.at;
    }

    /// Length of the lunch break; an open break runs until `now`.
    pub fn lunch_duration(&self, now: DateTime<Utc>) -> Duration {
        match self.lunch_start_time {
            Some(start) => {
                let end = self.lunch_end_time.or(self.check_out).unwrap_or(now);
                (end - start).max(Duration::zero())
            }
            None => Duration::zero(),
        }
    }

    /// `(checkOut ?? now) - checkIn - lunch`, never negative.
    pub fn worked_duration(&self, now: DateTime<Utc>) -> Duration {
        let Some(check_in) = self.check_in else {
            return Duration::zero();
        };
        let end = self.check_out.unwrap_or(now);
        (end - check_in - self.lunch_duration(now)).max(Duration::zero())
    }

    /// Worked hours rounded to two decimals.
    pub fn hours_worked(&self, now: DateTime<Utc>) -> f64 {
        round_hours(self.worked_duration(now))
    }
}

/// Converts a duration to hours rounded to two decimals.
pub fn round_hours(duration: Duration) -> f64 {
    let hours = duration.num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

/// Location submitted with a geofence check or an attendance action.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SiteLocationRequest {
    pub project_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: Option<f64>,
}

/// Response of the geofence pre-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateGeofenceResponse {
    pub inside_geofence: bool,
    pub distance: f64,
    pub can_proceed: bool,
    pub message: String,
    pub accuracy: Option<f64>,
}

/// Session value accepted by the combined submit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitSession {
    Checkin,
    Checkout,
}

impl SubmitSession {
    pub fn transition(&self) -> Transition {
        match self {
            SubmitSession::Checkin => Transition::ClockIn,
            SubmitSession::Checkout => Transition::ClockOut,
        }
    }
}

/// Request payload for `POST /attendance/submit`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendanceRequest {
    pub project_id: Uuid,
    pub session: SubmitSession,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: Option<f64>,
}

impl SubmitAttendanceRequest {
    pub fn location(&self) -> SiteLocationRequest {
        SiteLocationRequest {
            project_id: self.project_id,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
        }
    }
}

/// Plain message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

/// Response of the dedicated clock-in/out and lunch endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchResponse {
    pub message: String,
    pub session: SessionState,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub inside_geofence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch_end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
}

impl PunchResponse {
    /// Reports the timestamp the transition just stamped.
    pub fn for_transition(transition: Transition, record: &AttendanceRecord, inside: bool) -> Self {
        let mut response = Self {
            message: String::new(),
            session: record.session_state(),
            project_id: record.project_id,
            date: record.work_date,
            inside_geofence: inside,
            check_in_time: None,
            check_out_time: None,
            lunch_start_time: None,
            lunch_end_time: None,
            total_hours: None,
        };
        match transition {
            Transition::ClockIn => {
                response.message = "Clocked in successfully".to_string();
                response.check_in_time = record.check_in;
            }
            Transition::LunchStart => {
                response.message = "Lunch break started".to_string();
                response.lunch_start_time = record.lunch_start_time;
            }
            Transition::LunchEnd => {
                response.message = "Lunch break ended".to_string();
                response.lunch_end_time = record.lunch_end_time;
            }
            Transition::ClockOut => {
                response.message = "Clocked out successfully".to_string();
                response.check_out_time = record.check_out;
                response.total_hours = record.check_out.map(|out| record.hours_worked(out));
            }
        }
        response
    }
}

/// Query accepted by the today/status endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDayQuery {
    pub project_id: Option<Uuid>,
}

/// Response of `GET /worker/attendance/today`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayAttendanceResponse {
    pub session: SessionState,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub lunch_start_time: Option<DateTime<Utc>>,
    pub lunch_end_time: Option<DateTime<Utc>>,
    pub date: NaiveDate,
    pub project_id: Option<Uuid>,
}

impl TodayAttendanceResponse {
    pub fn from_record(record: Option<&AttendanceRecord>, date: NaiveDate) -> Self {
        Self {
            session: record
                .map(AttendanceRecord::session_state)
                .unwrap_or(SessionState::NotLoggedIn),
            check_in_time: record.and_then(|r| r.check_in),
            check_out_time: record.and_then(|r| r.check_out),
            lunch_start_time: record.and_then(|r| r.lunch_start_time),
            lunch_end_time: record.and_then(|r| r.lunch_end_time),
            date,
            project_id: record.map(|r| r.project_id),
        }
    }
}

/// Response of `GET /worker/attendance/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatusResponse {
    pub current_status: SessionState,
    pub project_id: Option<Uuid>,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub lunch_start_time: Option<DateTime<Utc>>,
    pub lunch_end_time: Option<DateTime<Utc>>,
    pub is_on_lunch_break: bool,
    pub hours_worked: f64,
    pub pending_checkout: bool,
}

impl AttendanceStatusResponse {
    pub fn from_record(
        record: Option<&AttendanceRecord>,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let today = TodayAttendanceResponse::from_record(record, date);
        Self {
            current_status: today.session,
            project_id: today.project_id,
            date,
            check_in_time: today.check_in_time,
            check_out_time: today.check_out_time,
            lunch_start_time: today.lunch_start_time,
            lunch_end_time: today.lunch_end_time,
            is_on_lunch_break: today.session == SessionState::OnLunch,
            hours_worked: record.map(|r| r.hours_worked(now)).unwrap_or(0.0),
            pending_checkout: record.is_some_and(|r| r.pending_checkout),
        }
    }
}

/// Query parameters for attendance history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistoryQuery {
    pub project_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// One record as reported by the history endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecordResponse {
    pub record_id: Uuid,
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub session: SessionState,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub lunch_start_time: Option<DateTime<Utc>>,
    pub lunch_end_time: Option<DateTime<Utc>>,
    pub inside_geofence_at_checkin: bool,
    pub inside_geofence_at_checkout: bool,
    pub pending_checkout: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
}

impl From<AttendanceRecord> for AttendanceRecordResponse {
    fn from(r: AttendanceRecord) -> Self {
        let session = r.session_state();
        let total_hours = r.check_out.map(|out| r.hours_worked(out));
        Self {
            record_id: r.record_id,
            employee_id: r.employee_id,
            project_id: r.project_id,
            date: r.work_date,
            session,
            check_in: r.check_in,
            check_out: r.check_out,
            lunch_start_time: r.lunch_start_time,
            lunch_end_time: r.lunch_end_time,
            inside_geofence_at_checkin: r.inside_geofence_at_checkin,
            inside_geofence_at_checkout: r.inside_geofence_at_checkout,
            pending_checkout: r.pending_checkout,
            total_hours,
        }
    }
}

/// Response of the history endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistoryResponse {
    pub records: Vec<AttendanceRecordResponse>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn key() -> AttendanceKey {
        AttendanceKey::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        )
    }

    fn change(transition: Transition, when: DateTime<Utc>) -> AttendanceChange {
        AttendanceChange {
            transition,
            at: when,
            location: GeoPoint::new(1.3521, 103.8198).unwrap(),
            inside_geofence: true,
            company_id: Uuid::nil(),
        }
    }

    fn run(steps: &[(Transition, DateTime<Utc>)]) -> AttendanceRecord {
        let mut record = AttendanceRecord::empty(&key(), Uuid::nil(), at(7, 0));
        for (transition, when) in steps {
            transition.check(Some(&record), *when).unwrap();
            record.apply(&change(*transition, *when));
        }
        record
    }

    #[test]
    fn test_derive_session_order() {
        let t = Some(at(8, 0));
        assert_eq!(derive_session(None, None, None, None), SessionState::NotLoggedIn);
        assert_eq!(derive_session(t, None, None, None), SessionState::CheckedIn);
        assert_eq!(derive_session(t, None, t, None), SessionState::OnLunch);
        assert_eq!(derive_session(t, None, t, t), SessionState::CheckedIn);
        assert_eq!(derive_session(t, t, t, None), SessionState::CheckedOut);
    }

    #[test]
    fn test_identical_timestamps_derive_identical_state() {
        let a = run(&[(Transition::ClockIn, at(8, 0)), (Transition::LunchStart, at(12, 0))]);
        let mut b = AttendanceRecord::empty(&key(), Uuid::new_v4(), at(6, 0));
        b.check_in = a.check_in;
        b.lunch_start_time = a.lunch_start_time;
        b.pending_checkout = true;
        assert_eq!(a.session_state().as_str(), b.session_state().as_str());
    }

    #[test]
    fn test_full_day_worked_eight_hours() {
        let record = run(&[
            (Transition::ClockIn, at(8, 0)),
            (Transition::LunchStart, at(12, 0)),
            (Transition::LunchEnd, at(13, 0)),
            (Transition::ClockOut, at(17, 0)),
        ]);
        assert_eq!(record.session_state(), SessionState::CheckedOut);
        assert_eq!(record.worked_duration(at(23, 0)), Duration::hours(8));
        assert_eq!(record.hours_worked(at(23, 0)), 8.0);
    }

    #[test]
    fn test_open_lunch_counts_until_now() {
        let record = run(&[(Transition::ClockIn, at(8, 0)), (Transition::LunchStart, at(12, 0))]);
        assert_eq!(record.lunch_duration(at(12, 30)), Duration::minutes(30));
        assert_eq!(record.worked_duration(at(12, 30)), Duration::hours(4));
    }

    #[test]
    fn test_clock_in_twice_is_invalid() {
        let record = run(&[(Transition::ClockIn, at(8, 0))]);
        let rejection = Transition::ClockIn.check(Some(&record), at(8, 0)).unwrap_err();
        assert!(matches!(
            rejection,
            TransitionRejection::InvalidTransition {
                state: SessionState::CheckedIn,
                ..
            }
        ));
    }

    #[test]
    fn test_actions_before_clock_in_are_not_clocked_in() {
        for transition in [Transition::LunchStart, Transition::LunchEnd, Transition::ClockOut] {
            assert_eq!(
                transition.check(None, at(9, 0)),
                Err(TransitionRejection::NotClockedIn { transition })
            );
        }
    }

    #[test]
    fn test_lunch_end_without_start_is_invalid() {
        let record = run(&[(Transition::ClockIn, at(8, 0))]);
        assert!(matches!(
            Transition::LunchEnd.check(Some(&record), at(13, 0)),
            Err(TransitionRejection::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_second_lunch_is_invalid() {
        let record = run(&[
            (Transition::ClockIn, at(8, 0)),
            (Transition::LunchStart, at(12, 0)),
            (Transition::LunchEnd, at(12, 30)),
        ]);
        assert!(Transition::LunchStart.check(Some(&record), at(14, 0)).is_err());
    }

    #[test]
    fn test_clock_out_on_lunch_is_invalid() {
        let record = run(&[(Transition::ClockIn, at(8, 0)), (Transition::LunchStart, at(12, 0))]);
        assert!(matches!(
            Transition::ClockOut.check(Some(&record), at(12, 30)),
            Err(TransitionRejection::InvalidTransition {
                state: SessionState::OnLunch,
                ..
            })
        ));
    }

    #[test]
    fn test_timestamps_must_increase() {
        let record = run(&[(Transition::ClockIn, at(8, 0))]);
        assert!(Transition::ClockOut.check(Some(&record), at(8, 0)).is_err());
        assert!(Transition::ClockOut.check(Some(&record), at(7, 59)).is_err());

        let on_lunch = run(&[(Transition::ClockIn, at(8, 0)), (Transition::LunchStart, at(12, 0))]);
        assert!(Transition::LunchEnd.check(Some(&on_lunch), at(12, 0)).is_err());
    }

    #[test]
    fn test_nothing_after_checkout() {
        let record = run(&[(Transition::ClockIn, at(8, 0)), (Transition::ClockOut, at(16, 0))]);
        for transition in [
            Transition::ClockIn,
            Transition::LunchStart,
            Transition::LunchEnd,
            Transition::ClockOut,
        ] {
            assert!(transition.check(Some(&record), at(17, 0)).is_err());
        }
    }

    #[test]
    fn test_clock_out_clears_pending_checkout() {
        let mut record = run(&[(Transition::ClockIn, at(8, 0))]);
        record.pending_checkout = true;
        record.apply(&change(Transition::ClockOut, at(17, 0)));
        assert!(!record.pending_checkout);
        assert!(record.inside_geofence_at_checkout);
    }

    #[test]
    fn test_status_response_without_record() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let status = AttendanceStatusResponse::from_record(None, date, at(9, 0));
        assert_eq!(status.current_status, SessionState::NotLoggedIn);
        assert_eq!(status.hours_worked, 0.0);
        assert!(!status.is_on_lunch_break);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["currentStatus"], "NOT_LOGGED_IN");
        assert!(json["checkInTime"].is_null());
    }

    #[test]
    fn test_submit_request_deserialization() {
        let json = r#"{
            "projectId": "550e8400-e29b-41d4-a716-446655440000",
            "session": "checkout",
            "latitude": 1.3521,
            "longitude": 103.8198
        }"#;
        let request: SubmitAttendanceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.session.transition(), Transition::ClockOut);
        assert!(request.accuracy.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_site_location_request_validation() {
        let request = SiteLocationRequest {
            project_id: Uuid::new_v4(),
            latitude: 95.0,
            longitude: 0.0,
            accuracy: Some(-1.0),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_punch_response_reports_stamped_time() {
        let record = run(&[(Transition::ClockIn, at(8, 0)), (Transition::ClockOut, at(16, 30))]);
        let response = PunchResponse::for_transition(Transition::ClockOut, &record, true);
        assert_eq!(response.session, SessionState::CheckedOut);
        assert_eq!(response.check_out_time, Some(at(16, 30)));
        assert_eq!(response.total_hours, Some(8.5));
        assert!(response.check_in_time.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalHours"], 8.5);
        assert!(json.get("lunchStartTime").is_none());
    }
}
