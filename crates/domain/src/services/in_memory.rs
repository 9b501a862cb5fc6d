//! In-memory implementations of the storage traits.
//!
//! Used when running without a database and by tests. A single mutex guards
//! all tables, which gives the same single-writer guarantee per key that
//! the unique index gives the Postgres store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::store::{
    AssignmentStore, AttendanceStore, EmployeeDirectory, ProjectCatalog, StoreError,
};
use crate::models::{
    AttendanceChange, AttendanceKey, AttendanceRecord, Employee, Project, TaskAssignment,
    Transition,
};

#[derive(Default)]
struct Tables {
    records: HashMap<AttendanceKey, AttendanceRecord>,
    assignments: HashMap<AttendanceKey, TaskAssignment>,
    employees: HashMap<Uuid, Employee>,
    projects: HashMap<Uuid, Project>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_employee(&self, employee: Employee) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.employees.insert(employee.employee_id, employee);
        }
    }

    pub fn insert_project(&self, project: Project) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.projects.insert(project.project_id, project);
        }
    }

    pub fn insert_assignment(&self, assignment: TaskAssignment) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.assignments.insert(assignment.key(), assignment);
        }
    }

    pub fn insert_record(&self, record: AttendanceRecord) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.records.insert(record.key(), record);
        }
    }

    /// Makes every call fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn record_count(&self) -> usize {
        self.tables.lock().map(|t| t.records.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("in-memory store unavailable".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store poisoned".to_string()))
    }
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn find(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.lock()?.records.get(key).cloned())
    }

    async fn apply(
        &self,
        key: &AttendanceKey,
        change: &AttendanceChange,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut tables = self.lock()?;
        let existing = tables.records.get(key);
        if change.transition.check(existing, change.at).is_err() {
            return Ok(None);
        }

        let mut record = match existing {
            Some(record) => record.clone(),
            None if change.transition == Transition::ClockIn => {
                AttendanceRecord::empty(key, change.company_id, change.at)
            }
            None => return Ok(None),
        };
        record.apply(change);
        tables.records.insert(*key, record.clone());
        Ok(Some(record))
    }

    async fn mark_pending_checkout(&self, key: &AttendanceKey) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        match tables.records.get_mut(key) {
            Some(record) if record.is_open() => {
                record.pending_checkout = true;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self
            .lock()?
            .records
            .values()
            .filter(|r| r.work_date == date)
            .cloned()
            .collect())
    }

    async fn find_for_employee_on(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records: Vec<_> = self
            .lock()?
            .records
            .values()
            .filter(|r| r.employee_id == employee_id && r.work_date == date)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn history(
        &self,
        employee_id: Uuid,
        project_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records: Vec<_> = self
            .lock()?
            .records
            .values()
            .filter(|r| r.employee_id == employee_id)
            .filter(|r| project_id.map_or(true, |p| r.project_id == p))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.work_date
                .cmp(&a.work_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[async_trait]
impl AssignmentStore for InMemoryStore {
    async fn find_assignment(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<TaskAssignment>, StoreError> {
        Ok(self.lock()?.assignments.get(key).cloned())
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<TaskAssignment>, StoreError> {
        Ok(self
            .lock()?
            .assignments
            .values()
            .filter(|a| a.work_date == date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryStore {
    async fn find_active_employee(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .lock()?
            .employees
            .get(&employee_id)
            .filter(|e| e.active && e.company_id == company_id)
            .cloned())
    }

    async fn find_employee(&self, employee_id: Uuid) -> Result<Option<Employee>, StoreError> {
        Ok(self.lock()?.employees.get(&employee_id).cloned())
    }
}

#[async_trait]
impl ProjectCatalog for InMemoryStore {
    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.lock()?.projects.get(&project_id).cloned())
    }
}
