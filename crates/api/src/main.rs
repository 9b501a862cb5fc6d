use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use domain::services::{MockNotificationService, NotificationService};
use tracing::{info, warn};

use site_attendance_api::{
    app::{create_app, AppState},
    config::Config,
    middleware::{init_logging, init_metrics},
    services::HttpNotificationService,
};

/// How long shutdown waits for a running job.
const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging).context("failed to initialize logging")?;
    init_metrics().context("failed to install metrics recorder")?;

    info!("Starting Site Attendance API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let notifications: Arc<dyn NotificationService> = if config.notifications.enabled {
        info!(url = %config.notifications.url, "Dispatching notifications over HTTP");
        Arc::new(HttpNotificationService::new(&config.notifications)?)
    } else {
        warn!("Notification dispatch disabled, alerts will only be logged");
        Arc::new(MockNotificationService::new())
    };

    let deps = persistence::collaborators(pool.clone(), notifications);
    let addr = config.socket_addr()?;
    let alerts_enabled = config.alerts.enabled;

    let state = AppState::new(config, pool, deps)?;
    let background = Arc::clone(&state.background);
    background.start();

    let scheduler = Arc::clone(&state.scheduler);
    if alerts_enabled {
        scheduler.start();
    } else {
        info!("Alert scheduler disabled by configuration");
    }

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if scheduler.is_running() {
        scheduler.stop(JOB_SHUTDOWN_TIMEOUT).await;
    }
    background.stop(JOB_SHUTDOWN_TIMEOUT).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
