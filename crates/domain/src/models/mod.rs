//! Domain models for site attendance.

pub mod alert;
pub mod assignment;
pub mod attendance;
pub mod employee;
pub mod geofence;
pub mod project;

pub use alert::{AlertPriority, AlertRequest, AlertType};
pub use assignment::TaskAssignment;
pub use attendance::{
    derive_session, round_hours, AttendanceChange, AttendanceDayQuery, AttendanceHistoryQuery,
    AttendanceHistoryResponse, AttendanceKey, AttendanceRecord, AttendanceRecordResponse,
    AttendanceStatusResponse, MessageResponse, PunchResponse, SessionState, SiteLocationRequest,
    SubmitAttendanceRequest, SubmitSession, TodayAttendanceResponse, Transition,
    TransitionRejection, ValidateGeofenceResponse,
};
pub use employee::{Employee, SupervisorContact};
pub use geofence::{GeoError, GeoPoint, Geofence};
pub use project::Project;
