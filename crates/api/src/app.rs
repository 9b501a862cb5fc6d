use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    AlertEngine, AttendanceService, Clock, Collaborators, GeofenceValidator, SystemClock,
};
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, ConfigValidationError};
use crate::jobs::{AttendanceAlertsJob, JobScheduler, PoolMetricsJob};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{alert_scheduler, attendance, health, worker_attendance};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub attendance: Arc<AttendanceService>,
    pub alerts: Arc<AlertEngine>,
    /// Runs the alert wake; the alert scheduler routes control it.
    pub scheduler: Arc<JobScheduler>,
    /// Service housekeeping, running for the life of the process.
    pub background: Arc<JobScheduler>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires the services over `deps` on the system clock.
    ///
    /// Both schedulers are created stopped.
    pub fn new(
        config: Config,
        pool: PgPool,
        deps: Collaborators,
    ) -> Result<Self, ConfigValidationError> {
        Self::with_clock(config, pool, deps, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        pool: PgPool,
        deps: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigValidationError> {
        let jwt = config
            .jwt
            .to_jwt_config()
            .map_err(|e| ConfigValidationError::InvalidValue(format!("jwt: {e}")))?;
        let settings = config.service_settings()?;
        let rules = config.alerts.rules()?;

        let attendance = AttendanceService::new(
            deps.clone(),
            GeofenceValidator::new(config.geofence.accuracy_threshold_meters),
            settings.clone(),
        );
        let alerts = Arc::new(AlertEngine::new(deps, rules, settings));

        let mut scheduler = JobScheduler::new();
        scheduler.register(AttendanceAlertsJob::new(
            Arc::clone(&alerts),
            Arc::clone(&clock),
            config.alerts.interval_minutes,
        ));

        let mut background = JobScheduler::new();
        background.register(PoolMetricsJob::new(pool.clone()));

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            attendance: Arc::new(attendance),
            alerts,
            scheduler: Arc::new(scheduler),
            background: Arc::new(background),
            clock,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let cors = if config.server.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Attendance routes (bearer JWT, checked by the extractors)
    let attendance_routes = Router::new()
        .route(
            "/api/v1/attendance/validate-geofence",
            post(attendance::validate_geofence),
        )
        .route("/api/v1/attendance/submit", post(attendance::submit_attendance))
        .route("/api/v1/attendance/history", get(attendance::get_history))
        .route(
            "/api/v1/worker/attendance/clock-in",
            post(worker_attendance::clock_in),
        )
        .route(
            "/api/v1/worker/attendance/clock-out",
            post(worker_attendance::clock_out),
        )
        .route(
            "/api/v1/worker/attendance/lunch-start",
            post(worker_attendance::lunch_start),
        )
        .route(
            "/api/v1/worker/attendance/lunch-end",
            post(worker_attendance::lunch_end),
        )
        .route("/api/v1/worker/attendance/today", get(worker_attendance::today))
        .route("/api/v1/worker/attendance/status", get(worker_attendance::status));

    // Alert routes (supervisor or admin role)
    let alert_routes = Router::new()
        .route(
            "/api/v1/attendance/check-alerts",
            post(alert_scheduler::check_alerts),
        )
        .route("/api/v1/alerts/scheduler", get(alert_scheduler::scheduler_status))
        .route(
            "/api/v1/alerts/scheduler/start",
            post(alert_scheduler::start_scheduler),
        )
        .route(
            "/api/v1/alerts/scheduler/stop",
            post(alert_scheduler::stop_scheduler),
        );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(attendance_routes)
        .merge(alert_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
