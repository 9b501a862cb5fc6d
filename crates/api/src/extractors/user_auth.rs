//! Bearer token extractors.
//!
//! The access token supplies the caller context of every attendance route:
//! the employee, the company they act for, and their role. [`UserAuth`]
//! trusts the token; the attendance service resolves the employee on each
//! transition. [`SupervisorAuth`] resolves the employee itself, since the
//! alert routes never reach the attendance service.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use domain::services::Caller;
use shared::jwt::{extract_employee_id, JwtConfig, JwtError};

use crate::app::AppState;
use crate::error::ApiError;

/// Caller authenticated by a valid access token.
#[derive(Debug, Clone, Copy)]
pub struct UserAuth(pub Caller);

impl UserAuth {
    /// Validates an access token and returns the caller it names.
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Caller, JwtError> {
        let claims = jwt.validate_token(token)?;
        let employee_id = extract_employee_id(&claims)?;

        Ok(Caller {
            employee_id,
            company_id: claims.company_id,
            role: claims.role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let caller = UserAuth::validate(&state.jwt, token).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            match e {
                JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
                _ => ApiError::Unauthorized("Invalid or expired token".to_string()),
            }
        })?;

        Ok(UserAuth(caller))
    }
}

/// Caller allowed to run and manage alert passes: a supervisor or admin
/// token naming an active employee of its company.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorAuth(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for SupervisorAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let UserAuth(caller) = UserAuth::from_request_parts(parts, state).await?;

        if !caller.role.can_manage_alerts() {
            tracing::warn!(
                employee_id = %caller.employee_id,
                "Alert management refused for worker role"
            );
            return Err(ApiError::Forbidden(
                "Supervisor or admin role required".to_string(),
            ));
        }

        state.attendance.authorize(&caller).await.map_err(|e| {
            tracing::warn!(
                employee_id = %caller.employee_id,
                company_id = %caller.company_id,
                error = %e,
                "Alert management refused for unresolved caller"
            );
            ApiError::from(e)
        })?;

        Ok(SupervisorAuth(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use shared::jwt::Role;
    use uuid::Uuid;

    fn jwt() -> JwtConfig {
        JwtConfig::from_secret("test_secret_key_for_jwt_testing_12345", 900, 0).unwrap()
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_validate_returns_caller() {
        let jwt = jwt();
        let employee_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        let (token, _) = jwt
            .generate_access_token(employee_id, company_id, Role::Supervisor)
            .unwrap();

        let caller = UserAuth::validate(&jwt, &token).unwrap();
        assert_eq!(caller.employee_id, employee_id);
        assert_eq!(caller.company_id, company_id);
        assert_eq!(caller.role, Role::Supervisor);
    }

    #[test]
    fn test_validate_rejects_foreign_token() {
        let other = JwtConfig::from_secret("another_secret_key_for_testing_999", 900, 0).unwrap();
        let (token, _) = other
            .generate_access_token(Uuid::new_v4(), Uuid::new_v4(), Role::Worker)
            .unwrap();

        assert!(UserAuth::validate(&jwt(), &token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))).unwrap(), "abc");
        assert!(matches!(
            bearer_token(&parts_with(None)),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Basic abc"))),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Bearer "))),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
