//! Geofence domain model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::validation::{validate_latitude, validate_longitude, validate_radius};

/// Errors raised when constructing geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("Geofence radius must be greater than 0, got {0}")]
    InvalidRadius(f64),

    #[error("Allowed variance must be a non-negative number, got {0}")]
    InvalidVariance(f64),
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        validate_latitude(latitude).map_err(|_| GeoError::InvalidLatitude(latitude))?;
        validate_longitude(longitude).map_err(|_| GeoError::InvalidLongitude(longitude))?;
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Circular boundary around a project site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_meters: f64,
    pub strict_mode: bool,
    pub allowed_variance_meters: f64,
}

impl Geofence {
    /// Creates a geofence, enforcing a positive radius and non-negative variance.
    pub fn new(
        center: GeoPoint,
        radius_meters: f64,
        strict_mode: bool,
        allowed_variance_meters: f64,
    ) -> Result<Self, GeoError> {
        validate_radius(radius_meters).map_err(|_| GeoError::InvalidRadius(radius_meters))?;
        if !allowed_variance_meters.is_finite() || allowed_variance_meters < 0.0 {
            return Err(GeoError::InvalidVariance(allowed_variance_meters));
        }
        Ok(Self {
            center,
            radius_meters,
            strict_mode,
            allowed_variance_meters,
        })
    }

    /// Distance from the center that still passes validation.
    ///
    /// Lenient fences extend the radius by the allowed variance; strict
    /// fences use the radius as-is.
    pub fn effective_radius(&self) -> f64 {
        if self.strict_mode {
            self.radius_meters
        } else {
            self.radius_meters + self.allowed_variance_meters
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> GeoPoint {
        GeoPoint::new(1.3521, 103.8198).unwrap()
    }

    #[test]
    fn test_geo_point_rejects_out_of_range() {
        assert_eq!(
            GeoPoint::new(91.0, 0.0),
            Err(GeoError::InvalidLatitude(91.0))
        );
        assert_eq!(
            GeoPoint::new(0.0, -181.0),
            Err(GeoError::InvalidLongitude(-181.0))
        );
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_geofence_rejects_non_positive_radius() {
        assert_eq!(
            Geofence::new(site(), 0.0, true, 0.0),
            Err(GeoError::InvalidRadius(0.0))
        );
        assert!(Geofence::new(site(), -10.0, false, 5.0).is_err());
    }

    #[test]
    fn test_geofence_rejects_negative_variance() {
        assert_eq!(
            Geofence::new(site(), 100.0, false, -1.0),
            Err(GeoError::InvalidVariance(-1.0))
        );
    }

    #[test]
    fn test_effective_radius() {
        let lenient = Geofence::new(site(), 100.0, false, 25.0).unwrap();
        assert_eq!(lenient.effective_radius(), 125.0);

        let strict = Geofence::new(site(), 100.0, true, 25.0).unwrap();
        assert_eq!(strict.effective_radius(), 100.0);
    }

    #[test]
    fn test_geofence_serialization() {
        let fence = Geofence::new(site(), 100.0, true, 0.0).unwrap();
        let json = serde_json::to_string(&fence).unwrap();
        assert!(json.contains("\"radiusMeters\":100"));
        assert!(json.contains("\"strictMode\":true"));
        assert!(json.contains("\"center\":{\"latitude\":1.3521"));
    }
}
