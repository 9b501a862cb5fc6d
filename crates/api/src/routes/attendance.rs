//! Attendance endpoint handlers: geofence pre-check, combined submit and history.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::{
    AttendanceHistoryQuery, AttendanceHistoryResponse, MessageResponse, SiteLocationRequest,
    SubmitAttendanceRequest, ValidateGeofenceResponse,
};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Check whether a location would pass the project geofence, without
/// changing any attendance state.
///
/// POST /api/v1/attendance/validate-geofence
pub async fn validate_geofence(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<SiteLocationRequest>,
) -> Result<Json<ValidateGeofenceResponse>, ApiError> {
    request.validate()?;

    let response = state.attendance.check_geofence(&caller, &request).await?;
    Ok(Json(response))
}

/// Combined check-in/check-out used by older clients.
///
/// POST /api/v1/attendance/submit
pub async fn submit_attendance(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<SubmitAttendanceRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    let transition = request.session.transition();
    let response = state
        .attendance
        .submit(&caller, &request.location(), transition, state.clock.now())
        .await?;

    info!(
        employee_id = %caller.employee_id,
        project_id = %request.project_id,
        action = transition.as_str(),
        "Attendance submitted"
    );

    Ok(Json(MessageResponse {
        message: response.message,
    }))
}

/// The caller's attendance records, newest first.
///
/// GET /api/v1/attendance/history?projectId=<uuid>&limit=<n>
pub async fn get_history(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Query(query): Query<AttendanceHistoryQuery>,
) -> Result<Json<AttendanceHistoryResponse>, ApiError> {
    let response = state.attendance.history(&caller, &query).await?;
    Ok(Json(response))
}
