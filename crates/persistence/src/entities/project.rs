//! Project entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{GeoError, GeoPoint, Geofence, Project};

/// Database row mapping for the projects table.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectEntity {
    pub id: i64,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_meters: f64,
    pub strict_mode: bool,
    pub allowed_variance_meters: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectEntity> for Project {
    type Error = GeoError;

    fn try_from(entity: ProjectEntity) -> Result<Self, Self::Error> {
        let center = GeoPoint::new(entity.center_latitude, entity.center_longitude)?;
        let geofence = Geofence::new(
            center,
            entity.radius_meters,
            entity.strict_mode,
            entity.allowed_variance_meters,
        )?;
        Ok(Self {
            project_id: entity.project_id,
            company_id: entity.company_id,
            name: entity.name,
            geofence,
            active: entity.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entity() -> ProjectEntity {
        ProjectEntity {
            id: 1,
            project_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Marina Tower".to_string(),
            center_latitude: 1.3521,
            center_longitude: 103.8198,
            radius_meters: 150.0,
            strict_mode: false,
            allowed_variance_meters: 20.0,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let project = Project::try_from(create_test_entity()).unwrap();
        assert_eq!(project.name, "Marina Tower");
        assert_eq!(project.geofence.effective_radius(), 170.0);
    }

    #[test]
    fn test_invalid_radius_is_rejected() {
        let mut entity = create_test_entity();
        entity.radius_meters = 0.0;
        assert_eq!(
            Project::try_from(entity),
            Err(GeoError::InvalidRadius(0.0))
        );
    }
}
