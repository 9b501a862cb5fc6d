//! Attendance record repository.
//!
//! Transitions are single conditional statements: the guard of each
//! transition is part of the `WHERE` clause, and clock-in is an upsert on the
//! (employee_id, project_id, work_date) unique constraint. A statement that
//! returns no row lost a race against a concurrent request.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{AttendanceChange, AttendanceKey, AttendanceRecord, Transition};
use domain::services::{AttendanceStore, StoreError};

use crate::entities::AttendanceRecordEntity;
use crate::metrics::QueryTimer;

/// Repository for attendance record database operations.
#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    /// Creates a new AttendanceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the record of a natural key.
    pub async fn find_by_key(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_attendance_by_key");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            SELECT * FROM attendance_records
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

    /// Stamps the check-in, creating the record if needed.
    ///
    /// An existing record is only touched while it has no check-in.
    pub async fn clock_in(
        &self,
        key: &AttendanceKey,
        change: &AttendanceChange,
    ) -> Result<Option<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("attendance_clock_in");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            INSERT INTO attendance_records (employee_id, project_id, work_date, company_id,
                                            check_in, check_in_latitude, check_in_longitude,
                                            inside_geofence_at_checkin, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $5)
            ON CONFLICT (employee_id, project_id, work_date) DO UPDATE
            SET check_in = EXCLUDED.check_in,
                check_in_latitude = EXCLUDED.check_in_latitude,
                check_in_longitude = EXCLUDED.check_in_longitude,
                inside_geofence_at_checkin = EXCLUDED.inside_geofence_at_checkin,
                updated_at = EXCLUDED.updated_at
            WHERE attendance_records.check_in IS NULL
            RETURNING *
            "#,
        )
        .bind(key.employee_id)
        .bind(key.project_id)
        .bind(key.work_date)
        .bind(change.company_id)
        .bind(change.at)
        .bind(change.location.latitude)
        .bind(change.location.longitude)
        .bind(change.inside_geofence)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Starts lunch on a checked-in record that has not taken lunch yet.
    pub async fn start_lunch(
        &self,
        key: &AttendanceKey,
        at: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("attendance_start_lunch");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            UPDATE attendance_records
            SET lunch_start_time = $4, updated_at = $4
            WHERE employee_id = $1 AND project_id = $2 AND work_date = $3
              AND check_in IS NOT NULL AND check_in <= $4
              AND check_out IS NULL
              AND lunch_start_time IS NULL
            RETURNING *
            "#,
        )
        .bind(key.employee_id)
        .bind(key.project_id)
        .bind(key.work_date)
        .bind(at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Ends an open lunch break.
    pub async fn end_lunch(
        &self,
        key: &AttendanceKey,
        at: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("attendance_end_lunch");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            UPDATE attendance_records
            SET lunch_end_time = $4, updated_at = $4
            WHERE employee_id = $1 AND project_id = $2 AND work_date = $3
              AND check_out IS NULL
              AND lunch_start_time IS NOT NULL AND lunch_start_time < $4
              AND lunch_end_time IS NULL
            RETURNING *
            "#,
        )
        .bind(key.employee_id)
        .bind(key.project_id)
        .bind(key.work_date)
        .bind(at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Stamps the check-out of a working (not on lunch) record.
    pub async fn clock_out(
        &self,
        key: &AttendanceKey,
        change: &AttendanceChange,
    ) -> Result<Option<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("attendance_clock_out");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            UPDATE attendance_records
            SET check_out = $4,
                check_out_latitude = $5,
                check_out_longitude = $6,
                inside_geofence_at_checkout = $7,
                pending_checkout = false,
                updated_at = $4
            WHERE employee_id = $1 AND project_id = $2 AND work_date = $3
              AND check_in IS NOT NULL AND check_in < $4
              AND check_out IS NULL
              AND (lunch_start_time IS NULL OR lunch_end_time IS NOT NULL)
            RETURNING *
            "#,
        )
        .bind(key.employee_id)
        .bind(key.project_id)
        .bind(key.work_date)
        .bind(change.at)
        .bind(change.location.latitude)
        .bind(change.location.longitude)
        .bind(change.inside_geofence)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Flags an open record as awaiting checkout. Returns whether a row changed.
    pub async fn set_pending_checkout(&self, key: &AttendanceKey) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("attendance_set_pending_checkout");
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET pending_checkout = true, updated_at = NOW()
            WHERE employee_id = $1 AND project_id = $2 AND work_date = $3
              AND check_in IS NOT NULL AND check_out IS NULL
            "#,
        )
        .bind(key.employee_id)
        .bind(key.project_id)
        .bind(key.work_date)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// All records of a work date.
    pub async fn find_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_attendance_by_date");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            SELECT * FROM attendance_records WHERE work_date = $1
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// One employee's records of a work date, most recently updated first.
    pub async fn find_by_employee_and_date(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_attendance_by_employee_and_date");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            SELECT * FROM attendance_records
            WHERE employee_id = $1 AND work_date = $2
            ORDER BY updated_at DESC
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// An employee's records, newest work date first.
    pub async fn find_history(
        &self,
        employee_id: Uuid,
        project_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_attendance_history");
        let result = sqlx::query_as::<_, AttendanceRecordEntity>(
            r#"
            SELECT * FROM attendance_records
            WHERE employee_id = $1
              AND ($2::uuid IS NULL OR project_id = $2)
            ORDER BY work_date DESC, created_at DESC
            LIMIT $3
            "#,
        )
        .bind(employee_id)
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

fn into_records(entities: Vec<AttendanceRecordEntity>) -> Vec<AttendanceRecord> {
    entities.into_iter().map(Into::into).collect()
}

#[async_trait]
impl AttendanceStore for AttendanceRepository {
    async fn find(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.find_by_key(key).await?.map(Into::into))
    }

    async fn apply(
        &self,
        key: &AttendanceKey,
        change: &AttendanceChange,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let entity = match change.transition {
            Transition::ClockIn => self.clock_in(key, change).await?,
            Transition::LunchStart => self.start_lunch(key, change.at).await?,
            Transition::LunchEnd => self.end_lunch(key, change.at).await?,
            Transition::ClockOut => self.clock_out(key, change).await?,
        };
        Ok(entity.map(Into::into))
    }

    async fn mark_pending_checkout(&self, key: &AttendanceKey) -> Result<bool, StoreError> {
        Ok(self.set_pending_checkout(key).await?)
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(into_records(self.find_by_date(date).await?))
    }

    async fn find_for_employee_on(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(into_records(
            self.find_by_employee_and_date(employee_id, date).await?,
        ))
    }

    async fn history(
        &self,
        employee_id: Uuid,
        project_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(into_records(
            self.find_history(employee_id, project_id, limit).await?,
        ))
    }
}
