//! Task assignment entity (database row mapping).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::TaskAssignment;

/// Database row mapping for the task_assignments table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskAssignmentEntity {
    pub id: i64,
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub work_date: NaiveDate,
    pub supervisor_id: Option<Uuid>,
    pub shift_start: Option<NaiveTime>,
    pub shift_end: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
}

impl From<TaskAssignmentEntity> for TaskAssignment {
    fn from(entity: TaskAssignmentEntity) -> Self {
        Self {
            employee_id: entity.employee_id,
            project_id: entity.project_id,
            work_date: entity.work_date,
            supervisor_id: entity.supervisor_id,
            shift_start: entity.shift_start,
            shift_end: entity.shift_end,
        }
    }
}
