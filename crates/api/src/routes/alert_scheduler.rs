//! Alert pass trigger and scheduler lifecycle handlers.

use std::time::Duration;

use axum::{extract::State, Json};
use domain::services::AlertPassReport;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::SupervisorAuth;
use crate::jobs::SchedulerStatus;

/// How long a stop request waits for a running wake to finish.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct CheckAlertsResponse {
    pub success: bool,
    pub results: AlertPassReport,
}

/// Scheduler status plus whether the request changed it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerControlResponse {
    pub changed: bool,
    #[serde(flatten)]
    pub status: SchedulerStatus,
    pub interval_minutes: u64,
}

fn control_response(state: &AppState, changed: bool) -> SchedulerControlResponse {
    SchedulerControlResponse {
        changed,
        status: state.scheduler.status(),
        interval_minutes: state.config.alerts.interval_minutes,
    }
}

/// Run one alert pass now over the caller's company.
///
/// POST /api/v1/attendance/check-alerts
pub async fn check_alerts(
    State(state): State<AppState>,
    SupervisorAuth(caller): SupervisorAuth,
) -> Result<Json<CheckAlertsResponse>, ApiError> {
    info!(
        employee_id = %caller.employee_id,
        company_id = %caller.company_id,
        "Manual alert pass requested"
    );

    let results = state
        .alerts
        .run_pass_for_company(state.clock.now(), caller.company_id)
        .await?;
    Ok(Json(CheckAlertsResponse {
        success: true,
        results,
    }))
}

/// GET /api/v1/alerts/scheduler
pub async fn scheduler_status(
    State(state): State<AppState>,
    SupervisorAuth(_): SupervisorAuth,
) -> Json<SchedulerControlResponse> {
    Json(control_response(&state, false))
}

/// POST /api/v1/alerts/scheduler/start
pub async fn start_scheduler(
    State(state): State<AppState>,
    SupervisorAuth(caller): SupervisorAuth,
) -> Json<SchedulerControlResponse> {
    let changed = state.scheduler.start();
    if changed {
        info!(employee_id = %caller.employee_id, "Alert scheduler started");
    }
    Json(control_response(&state, changed))
}

/// POST /api/v1/alerts/scheduler/stop
pub async fn stop_scheduler(
    State(state): State<AppState>,
    SupervisorAuth(caller): SupervisorAuth,
) -> Json<SchedulerControlResponse> {
    let changed = state.scheduler.stop(STOP_TIMEOUT).await;
    if changed {
        info!(employee_id = %caller.employee_id, "Alert scheduler stopped");
    }
    Json(control_response(&state, changed))
}
