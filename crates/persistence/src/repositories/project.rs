//! Project catalog repository.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use domain::models::Project;
use domain::services::{ProjectCatalog, StoreError};

use crate::entities::ProjectEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_project_id(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_project_by_id");
        let result = sqlx::query_as::<_, ProjectEntity>(
            r#"
            SELECT * FROM projects WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl ProjectCatalog for ProjectRepository {
    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, StoreError> {
        match self.find_by_project_id(project_id).await? {
            Some(entity) => Project::try_from(entity).map(Some).map_err(|e| {
                warn!(%project_id, error = %e, "Project row carries an invalid geofence");
                StoreError::Backend(format!("project {} has an invalid geofence: {}", project_id, e))
            }),
            None => Ok(None),
        }
    }
}
