//! Persistence layer for the site attendance backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Postgres implementations of the domain storage traits

use std::sync::Arc;

use sqlx::PgPool;

use domain::services::{Collaborators, NotificationService};

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

use repositories::{
    AttendanceRepository, EmployeeRepository, ProjectRepository, TaskAssignmentRepository,
};

/// Wires the Postgres repositories into the services' collaborators.
pub fn collaborators(pool: PgPool, notifications: Arc<dyn NotificationService>) -> Collaborators {
    Collaborators {
        records: Arc::new(AttendanceRepository::new(pool.clone())),
        assignments: Arc::new(TaskAssignmentRepository::new(pool.clone())),
        employees: Arc::new(EmployeeRepository::new(pool.clone())),
        projects: Arc::new(ProjectRepository::new(pool)),
        notifications,
    }
}
