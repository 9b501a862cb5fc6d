//! Storage seams of the attendance core.
//!
//! The state machine and the alert engine only talk to these traits. The
//! persistence crate implements them on Postgres; [`super::in_memory`]
//! implements them for development and tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AttendanceChange, AttendanceKey, AttendanceRecord, Employee, Project, TaskAssignment,
};

/// Failure of a storage backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Attendance records keyed by (employee, project, date).
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Applies a change atomically against the natural key.
    ///
    /// Clock-in creates the record if none exists. The transition guard is
    /// re-evaluated by the write itself; `Ok(None)` means it no longer held
    /// (a concurrent request got there first) and nothing was written.
    async fn apply(
        &self,
        key: &AttendanceKey,
        change: &AttendanceChange,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Flags an open record as awaiting a checkout from inside the fence.
    ///
    /// Returns `false` when there is no open record for the key.
    async fn mark_pending_checkout(&self, key: &AttendanceKey) -> Result<bool, StoreError>;

    /// All records of a work date.
    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// One employee's records of a work date, most recently updated first.
    async fn find_for_employee_on(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// An employee's records, newest work date first.
    async fn history(
        &self,
        employee_id: Uuid,
        project_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}

/// Read-only task assignments from the scheduling system.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn find_assignment(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<TaskAssignment>, StoreError>;

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<TaskAssignment>, StoreError>;
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// The employee if it exists, is active, and belongs to the company.
    async fn find_active_employee(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Employee>, StoreError>;

    async fn find_employee(&self, employee_id: Uuid) -> Result<Option<Employee>, StoreError>;
}

#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, StoreError>;
}

/// Runs a storage call with a finite deadline.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
