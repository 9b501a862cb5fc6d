//! Employee directory repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::Employee;
use domain::services::{EmployeeDirectory, StoreError};

use crate::entities::EmployeeEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<EmployeeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_employee_by_id");
        let result = sqlx::query_as::<_, EmployeeEntity>(
            r#"
            SELECT * FROM employees WHERE employee_id = $1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an active employee of a company.
    pub async fn find_active_in_company(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<EmployeeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_employee_in_company");
        let result = sqlx::query_as::<_, EmployeeEntity>(
            r#"
            SELECT * FROM employees
            WHERE employee_id = $1 AND company_id = $2 AND active = true
            "#,
        )
        .bind(employee_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl EmployeeDirectory for EmployeeRepository {
    async fn find_active_employee(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .find_active_in_company(company_id, employee_id)
            .await?
            .map(Into::into))
    }

    async fn find_employee(&self, employee_id: Uuid) -> Result<Option<Employee>, StoreError> {
        Ok(self.find_by_employee_id(employee_id).await?.map(Into::into))
    }
}
