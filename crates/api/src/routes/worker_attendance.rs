//! Worker attendance handlers: the four transitions and the day views.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::{
    AttendanceDayQuery, AttendanceStatusResponse, PunchResponse, SiteLocationRequest,
    TodayAttendanceResponse, Transition,
};
use domain::services::Caller;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

async fn punch(
    state: &AppState,
    caller: &Caller,
    request: SiteLocationRequest,
    transition: Transition,
) -> Result<Json<PunchResponse>, ApiError> {
    request.validate()?;

    let outcome = state
        .attendance
        .punch(caller, &request, transition, state.clock.now())
        .await?;

    Ok(Json(PunchResponse::for_transition(
        transition,
        &outcome.record,
        outcome.check.inside_geofence,
    )))
}

/// POST /api/v1/worker/attendance/clock-in
pub async fn clock_in(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<SiteLocationRequest>,
) -> Result<Json<PunchResponse>, ApiError> {
    punch(&state, &caller, request, Transition::ClockIn).await
}

/// POST /api/v1/worker/attendance/clock-out
pub async fn clock_out(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<SiteLocationRequest>,
) -> Result<Json<PunchResponse>, ApiError> {
    punch(&state, &caller, request, Transition::ClockOut).await
}

/// POST /api/v1/worker/attendance/lunch-start
pub async fn lunch_start(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<SiteLocationRequest>,
) -> Result<Json<PunchResponse>, ApiError> {
    punch(&state, &caller, request, Transition::LunchStart).await
}

/// POST /api/v1/worker/attendance/lunch-end
pub async fn lunch_end(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<SiteLocationRequest>,
) -> Result<Json<PunchResponse>, ApiError> {
    punch(&state, &caller, request, Transition::LunchEnd).await
}

/// Today's record of the caller.
///
/// GET /api/v1/worker/attendance/today?projectId=<uuid>
pub async fn today(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Query(query): Query<AttendanceDayQuery>,
) -> Result<Json<TodayAttendanceResponse>, ApiError> {
    let response = state
        .attendance
        .today(&caller, query.project_id, state.clock.now())
        .await?;
    Ok(Json(response))
}

/// Current session, lunch flag and hours worked so far.
///
/// GET /api/v1/worker/attendance/status?projectId=<uuid>
pub async fn status(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Query(query): Query<AttendanceDayQuery>,
) -> Result<Json<AttendanceStatusResponse>, ApiError> {
    let response = state
        .attendance
        .status(&caller, query.project_id, state.clock.now())
        .await?;
    Ok(Json(response))
}
