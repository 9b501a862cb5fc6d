//! Task assignment domain model.
//!
//! Assignments come from the external scheduling system and are read-only
//! here. They say who should be on which site on a given day and who
//! supervises them.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attendance::AttendanceKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub work_date: NaiveDate,
    pub supervisor_id: Option<Uuid>,
    /// Local shift start; the configured default applies when absent.
    pub shift_start: Option<NaiveTime>,
    /// Local shift end; the configured default applies when absent.
    pub shift_end: Option<NaiveTime>,
}

impl TaskAssignment {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(self.employee_id, self.project_id, self.work_date)
    }
}
