//! Integration tests for the alert pass and scheduler endpoints.
//!
//! Run with: cargo test --test alerts_integration

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    at_site, get_request_with_auth, json_request_with_auth, parse_response_body,
    post_request_with_auth, TestContext,
};
use domain::models::AlertType;
use domain::services::MockNotificationService;
use serde_json::Value;
use shared::jwt::Role;
use tower::ServiceExt;
use uuid::Uuid;

const CHECK_ALERTS: &str = "/api/v1/attendance/check-alerts";

async fn post(ctx: &TestContext, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = ctx
        .app()
        .oneshot(post_request_with_auth(uri, token))
        .await
        .unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

fn outcomes_of<'a>(results: &'a Value, bucket: &str, alert_type: &str) -> Vec<&'a Value> {
    results[bucket]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|o| o["alertType"] == alert_type)
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_check_alerts_requires_token() {
    let ctx = TestContext::new();
    let response = ctx
        .app()
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri(CHECK_ALERTS)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_worker_cannot_trigger_alert_pass() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();

    let (status, body) = post(&ctx, CHECK_ALERTS, &ctx.worker_token(&site)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(ctx.notifications.sent().is_empty());
}

#[tokio::test]
async fn test_missed_login_is_reported_and_sent() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();

    let (status, body) = post(&ctx, CHECK_ALERTS, &ctx.supervisor_token(&site)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["results"]["evaluatedAt"].is_string());
    assert!(body["results"]["localTime"]
        .as_str()
        .unwrap()
        .contains("T09:00"));
    assert_eq!(body["results"]["companyId"], site.company_id.to_string());

    let sent = outcomes_of(&body["results"], "sent", "MISSED_LOGIN");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["workerId"], site.worker_id.to_string());
    assert_eq!(sent[0]["projectId"], site.project_id.to_string());

    let notifications = ctx.notifications.sent_of_type(AlertType::MissedLogin);
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].recipients.contains(&site.worker_id));
    assert!(notifications[0].recipients.contains(&site.supervisor_id));
    assert!(notifications[0].requires_acknowledgment);
}

#[tokio::test]
async fn test_checked_in_worker_gets_no_missed_login() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();

    let response = ctx
        .app()
        .oneshot(json_request_with_auth(
            axum::http::Method::POST,
            "/api/v1/worker/attendance/clock-in",
            at_site(&site),
            &ctx.worker_token(&site),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = post(&ctx, CHECK_ALERTS, &ctx.supervisor_token(&site)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["candidates"], 0);
    assert!(outcomes_of(&body["results"], "sent", "MISSED_LOGIN").is_empty());
    assert!(ctx.notifications.sent_of_type(AlertType::MissedLogin).is_empty());
}

#[tokio::test]
async fn test_repeated_passes_alert_again() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();
    let token = ctx.supervisor_token(&site);

    let (first, _) = post(&ctx, CHECK_ALERTS, &token).await;
    let (second, _) = post(&ctx, CHECK_ALERTS, &token).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(ctx.notifications.sent_of_type(AlertType::MissedLogin).len(), 2);
}

#[tokio::test]
async fn test_one_failed_dispatch_does_not_stop_the_pass() {
    let failing_worker = Uuid::new_v4();
    let ctx = TestContext::with_notifications(MockNotificationService::failing_for(failing_worker));

    let healthy = ctx.seed_site();
    let company_id = healthy.company_id;
    ctx.store.insert_employee(domain::models::Employee {
        employee_id: failing_worker,
        company_id,
        display_name: "Bala".to_string(),
        phone: None,
        email: None,
        active: true,
    });
    ctx.assign(&healthy, failing_worker, None);

    let (status, body) = post(&ctx, CHECK_ALERTS, &ctx.supervisor_token(&healthy)).await;
    assert_eq!(status, StatusCode::OK);

    let sent = outcomes_of(&body["results"], "sent", "MISSED_LOGIN");
    let failed = outcomes_of(&body["results"], "failed", "MISSED_LOGIN");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["workerId"], healthy.worker_id.to_string());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["workerId"], failing_worker.to_string());
    assert!(failed[0]["error"].is_string());
}

#[tokio::test]
async fn test_unknown_supervisor_cannot_trigger_alert_pass() {
    let ctx = TestContext::new();
    ctx.seed_site();

    let stranger = ctx.token(Uuid::new_v4(), Uuid::new_v4(), Role::Supervisor);
    let (status, body) = post(&ctx, CHECK_ALERTS, &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized_employee");
    assert!(ctx.notifications.sent().is_empty());
}

#[tokio::test]
async fn test_supervisor_token_for_another_company_is_refused() {
    let ctx = TestContext::new();
    let ours = ctx.seed_site();
    let theirs = ctx.seed_site();

    let borrowed = ctx.token(ours.supervisor_id, theirs.company_id, Role::Supervisor);
    let (status, body) = post(&ctx, CHECK_ALERTS, &borrowed).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized_employee");
    assert!(ctx.notifications.sent().is_empty());
}

#[tokio::test]
async fn test_alert_pass_only_covers_callers_company() {
    let ctx = TestContext::new();
    let ours = ctx.seed_site();
    let theirs = ctx.seed_site();

    let (status, body) = post(&ctx, CHECK_ALERTS, &ctx.supervisor_token(&ours)).await;
    assert_eq!(status, StatusCode::OK);

    let sent = outcomes_of(&body["results"], "sent", "MISSED_LOGIN");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["workerId"], ours.worker_id.to_string());
    assert!(!body.to_string().contains(&theirs.worker_id.to_string()));
    assert!(!body.to_string().contains(&theirs.project_id.to_string()));

    let notifications = ctx.notifications.sent();
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].recipients.contains(&theirs.worker_id));
}

#[tokio::test]
async fn test_alert_pass_store_outage_is_service_unavailable() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();
    let token = ctx.supervisor_token(&site);
    ctx.store.set_unavailable(true);

    // The caller can no longer be resolved either
    let (status, body) = post(&ctx, CHECK_ALERTS, &token).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("resolve employee"));
}

#[tokio::test]
async fn test_scheduler_start_and_stop_are_idempotent() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();
    let token = ctx.supervisor_token(&site);

    let response = ctx
        .app()
        .oneshot(get_request_with_auth("/api/v1/alerts/scheduler", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["running"], false);
    assert_eq!(body["changed"], false);
    assert_eq!(body["intervalMinutes"], 15);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["name"], "attendance_alerts");

    let (status, body) = post(&ctx, "/api/v1/alerts/scheduler/start", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    assert_eq!(body["running"], true);
    assert!(body["startedAt"].is_string());

    let (_, body) = post(&ctx, "/api/v1/alerts/scheduler/start", &token).await;
    assert_eq!(body["changed"], false);
    assert_eq!(body["running"], true);

    let (status, body) = post(&ctx, "/api/v1/alerts/scheduler/stop", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    assert_eq!(body["running"], false);

    let (_, body) = post(&ctx, "/api/v1/alerts/scheduler/stop", &token).await;
    assert_eq!(body["changed"], false);
    assert!(body["startedAt"].is_null());
}

#[tokio::test]
async fn test_stopping_alerts_leaves_background_jobs_running() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();
    let token = ctx.supervisor_token(&site);

    let background = &ctx.state.background;
    assert!(background.start());
    assert!(background
        .status()
        .jobs
        .iter()
        .any(|job| job.name == "pool_metrics"));

    let (_, body) = post(&ctx, "/api/v1/alerts/scheduler/start", &token).await;
    assert_eq!(body["running"], true);
    let (_, body) = post(&ctx, "/api/v1/alerts/scheduler/stop", &token).await;
    assert_eq!(body["running"], false);

    assert!(background.is_running());
    assert!(background.stop(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_unknown_supervisor_cannot_control_scheduler() {
    let ctx = TestContext::new();
    let stranger = ctx.token(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);

    let (status, _) = post(&ctx, "/api/v1/alerts/scheduler/start", &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!ctx.state.scheduler.is_running());
}

#[tokio::test]
async fn test_worker_cannot_control_scheduler() {
    let ctx = TestContext::new();
    let site = ctx.seed_site();

    let (status, _) = post(&ctx, "/api/v1/alerts/scheduler/start", &ctx.worker_token(&site)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!ctx.state.scheduler.is_running());
}
