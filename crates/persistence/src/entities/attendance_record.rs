//! Attendance record entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{AttendanceRecord, GeoPoint};

/// Database row mapping for the attendance_records table.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRecordEntity {
    pub id: i64,
    pub record_id: Uuid,
    pub employee_id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub work_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub lunch_start_time: Option<DateTime<Utc>>,
    pub lunch_end_time: Option<DateTime<Utc>>,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub inside_geofence_at_checkin: bool,
    pub inside_geofence_at_checkout: bool,
    pub pending_checkout: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn point(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon).ok(),
        _ => None,
    }
}

impl From<AttendanceRecordEntity> for AttendanceRecord {
    fn from(entity: AttendanceRecordEntity) -> Self {
        Self {
            record_id: entity.record_id,
            employee_id: entity.employee_id,
            project_id: entity.project_id,
            company_id: entity.company_id,
            work_date: entity.work_date,
            check_in: entity.check_in,
            check_out: entity.check_out,
            lunch_start_time: entity.lunch_start_time,
            lunch_end_time: entity.lunch_end_time,
            check_in_location: point(entity.check_in_latitude, entity.check_in_longitude),
            check_out_location: point(entity.check_out_latitude, entity.check_out_longitude),
            inside_geofence_at_checkin: entity.inside_geofence_at_checkin,
            inside_geofence_at_checkout: entity.inside_geofence_at_checkout,
            pending_checkout: entity.pending_checkout,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::SessionState;

    fn create_test_entity() -> AttendanceRecordEntity {
        AttendanceRecordEntity {
            id: 1,
            record_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            work_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            check_in: Some(Utc::now()),
            check_out: None,
            lunch_start_time: None,
            lunch_end_time: None,
            check_in_latitude: Some(1.3521),
            check_in_longitude: Some(103.8198),
            check_out_latitude: None,
            check_out_longitude: None,
            inside_geofence_at_checkin: true,
            inside_geofence_at_checkout: false,
            pending_checkout: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let entity = create_test_entity();
        let record: AttendanceRecord = entity.clone().into();

        assert_eq!(record.record_id, entity.record_id);
        assert_eq!(record.work_date, entity.work_date);
        assert_eq!(record.session_state(), SessionState::CheckedIn);
        assert_eq!(
            record.check_in_location,
            Some(GeoPoint::new(1.3521, 103.8198).unwrap())
        );
        assert_eq!(record.check_out_location, None);
    }

    #[test]
    fn test_partial_location_is_dropped() {
        let mut entity = create_test_entity();
        entity.check_in_longitude = None;
        let record: AttendanceRecord = entity.into();
        assert_eq!(record.check_in_location, None);
    }
}
