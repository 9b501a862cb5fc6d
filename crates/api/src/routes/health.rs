//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub alert_scheduler: SchedulerHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerHealth {
    pub running: bool,
    pub interval_minutes: u64,
}

/// Simple status response for liveness/readiness checks.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Pings the database within the store deadline; `None` when unreachable.
async fn database_latency(state: &AppState) -> Option<u64> {
    let deadline = state.config.database.query_timeout();
    match tokio::time::timeout(deadline, persistence::db::ping(&state.pool)).await {
        Ok(Ok(latency)) => Some(latency.as_millis() as u64),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Database health check failed");
            None
        }
        Err(_) => {
            tracing::warn!(timeout = ?deadline, "Database health check timed out");
            None
        }
    }
}

fn health_response(latency_ms: Option<u64>, scheduler: SchedulerHealth) -> HealthResponse {
    let connected = latency_ms.is_some();
    HealthResponse {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected,
            latency_ms,
        },
        alert_scheduler: scheduler,
    }
}

/// Full health check endpoint.
///
/// Reports database connectivity and whether the alert scheduler runs.
/// Responds 503 with the same body when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let latency_ms = database_latency(&state).await;
    let response = health_response(
        latency_ms,
        SchedulerHealth {
            running: state.scheduler.is_running(),
            interval_minutes: state.config.alerts.interval_minutes,
        },
    );

    let status = if response.database.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match database_latency(&state).await {
        Some(_) => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
        None => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
