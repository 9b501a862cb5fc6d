use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::{AlertPassError, AttendanceError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {message}")]
    InvalidFields {
        message: String,
        details: Vec<ValidationDetail>,
    },

    #[error("Outside geofence: {message}")]
    OutsideGeofence { message: String, distance: f64 },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not clocked in: {0}")]
    NotClockedIn(String),

    #[error("No task assigned: {0}")]
    NoTaskAssigned(String),

    #[error("Unauthorized employee: {0}")]
    UnauthorizedEmployee(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::InvalidFields { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                Some(json!(details)),
            ),
            ApiError::OutsideGeofence { message, distance } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "outside_geofence",
                message,
                Some(json!({ "distance": distance })),
            ),
            ApiError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "invalid_transition", msg, None)
            }
            ApiError::NotClockedIn(msg) => (StatusCode::CONFLICT, "not_clocked_in", msg, None),
            ApiError::NoTaskAssigned(msg) => (StatusCode::FORBIDDEN, "no_task_assigned", msg, None),
            ApiError::UnauthorizedEmployee(msg) => {
                (StatusCode::FORBIDDEN, "unauthorized_employee", msg, None)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        let message = err.to_string();
        match err {
            AttendanceError::OutsideGeofence { distance, message } => {
                ApiError::OutsideGeofence { message, distance }
            }
            AttendanceError::InvalidTransition { .. } => ApiError::InvalidTransition(message),
            AttendanceError::NotClockedIn { .. } => ApiError::NotClockedIn(message),
            AttendanceError::NoTaskAssigned { .. } => ApiError::NoTaskAssigned(message),
            AttendanceError::UnauthorizedEmployee => ApiError::UnauthorizedEmployee(message),
            AttendanceError::LookupFailure(msg) => ApiError::NotFound(msg),
            AttendanceError::InvalidLocation(e) => ApiError::Validation(e.to_string()),
            AttendanceError::Store { operation, source } => {
                tracing::error!(operation, error = %source, "Attendance storage failure");
                ApiError::ServiceUnavailable(format!(
                    "Could not {operation}, please retry"
                ))
            }
        }
    }
}

impl From<AlertPassError> for ApiError {
    fn from(err: AlertPassError) -> Self {
        match err {
            AlertPassError::AlreadyRunning => {
                ApiError::Conflict("An alert pass is already running".into())
            }
            AlertPassError::Load { operation, source } => {
                tracing::error!(operation, error = %source, "Alert pass could not load its inputs");
                ApiError::ServiceUnavailable(format!("Could not {operation}, please retry"))
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = match details.as_slice() {
            [only] => only.message.clone(),
            _ => format!("{} validation errors", details.len()),
        };

        ApiError::InvalidFields { message, details }
    }
}
