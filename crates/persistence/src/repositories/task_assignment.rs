//! Task assignment repository (read-only).

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use domain::models::{AttendanceKey, TaskAssignment};
use domain::services::{AssignmentStore, StoreError};

use crate::entities::TaskAssignmentEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct TaskAssignmentRepository {
    pool: PgPool,
}

impl TaskAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_key(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<TaskAssignmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_task_assignment_by_key");
        let result = sqlx::query_as::<_, TaskAssignmentEntity>(
            r#"
            SELECT * FROM task_assignments
            WHERE employee_id = $1 AND project_id = $2 AND work_date = $3
            "#,
        )
        .bind(key.employee_id)
        .bind(key.project_id)
        .bind(key.work_date)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<TaskAssignmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_task_assignments_by_date");
        let result = sqlx::query_as::<_, TaskAssignmentEntity>(
            r#"
            SELECT * FROM task_assignments WHERE work_date = $1
            ORDER BY employee_id, project_id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl AssignmentStore for TaskAssignmentRepository {
    async fn find_assignment(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<TaskAssignment>, StoreError> {
        Ok(self.find_by_key(key).await?.map(Into::into))
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<TaskAssignment>, StoreError> {
        Ok(self
            .find_by_date(date)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
