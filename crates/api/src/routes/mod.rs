//! HTTP route handlers.

pub mod alert_scheduler;
pub mod attendance;
pub mod health;
pub mod worker_attendance;
