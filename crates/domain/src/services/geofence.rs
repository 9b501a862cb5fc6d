//! Geofence validation.
//!
//! Distances use the haversine formula on a spherical Earth, which is
//! accurate to within meters at the scale of a construction site.

use serde::Serialize;

use crate::models::geofence::{GeoPoint, Geofence};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default GPS accuracy above which strict fences refuse to decide.
pub const DEFAULT_ACCURACY_THRESHOLD_METERS: f64 = 50.0;

/// Great-circle distance in meters between two points.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_METERS * c
}

/// A position reported by a device, with its optional accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub accuracy: Option<f64>,
}

impl LocationFix {
    pub fn new(point: GeoPoint, accuracy: Option<f64>) -> Self {
        Self { point, accuracy }
    }

    /// Accuracy if it is known; zero and negative values mean unknown.
    pub fn known_accuracy(&self) -> Option<f64> {
        self.accuracy.filter(|a| a.is_finite() && *a > 0.0)
    }
}

/// Outcome of checking a location against a geofence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceCheck {
    /// `distance <= radius`, boundary inclusive, ignoring variance and accuracy.
    pub inside_geofence: bool,
    pub distance: f64,
    /// Whether an attendance action may proceed.
    pub is_valid: bool,
    pub message: String,
    pub accuracy: Option<f64>,
}

/// Decides inside/outside for a circular boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceValidator {
    accuracy_threshold_meters: f64,
}

impl Default for GeofenceValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ACCURACY_THRESHOLD_METERS)
    }
}

impl GeofenceValidator {
    pub fn new(accuracy_threshold_meters: f64) -> Self {
        Self {
            accuracy_threshold_meters,
        }
    }

    pub fn accuracy_threshold_meters(&self) -> f64 {
        self.accuracy_threshold_meters
    }

    pub fn validate(&self, fix: &LocationFix, fence: &Geofence) -> GeofenceCheck {
        let distance = haversine_distance(&fix.point, &fence.center);
        let inside_geofence = distance <= fence.radius_meters;
        let accuracy = fix.known_accuracy();

        if fence.strict_mode {
            if let Some(acc) = accuracy.filter(|a| *a > self.accuracy_threshold_meters) {
                return GeofenceCheck {
                    inside_geofence,
                    distance,
                    is_valid: false,
                    message: format!(
                        "GPS accuracy too low ({:.0}m, need {:.0}m or better); move to an open area and retry",
                        acc, self.accuracy_threshold_meters
                    ),
                    accuracy: fix.accuracy,
                };
            }
        }

        let allowed = fence.effective_radius();
        let is_valid = distance <= allowed;

        let message = if inside_geofence {
            format!("Inside project geofence ({:.0}m from center)", distance)
        } else if is_valid {
            format!(
                "Within allowed variance ({:.0}m beyond boundary)",
                distance - fence.radius_meters
            )
        } else {
            format!("Outside project geofence by {:.0}m", distance - allowed)
        };

        GeofenceCheck {
            inside_geofence,
            distance,
            is_valid,
            message,
            accuracy: fix.accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn fence(radius: f64, strict: bool, variance: f64) -> Geofence {
        Geofence::new(point(1.3521, 103.8198), radius, strict, variance).unwrap()
    }

    /// A point `meters` due north of the fence center.
    fn north_of_center(meters: f64) -> GeoPoint {
        let delta = (meters / EARTH_RADIUS_METERS).to_degrees();
        point(1.3521 + delta, 103.8198)
    }

    #[test]
    fn test_same_point_is_zero_distance() {
        let check = GeofenceValidator::default().validate(
            &LocationFix::new(point(1.3521, 103.8198), None),
            &fence(100.0, true, 0.0),
        );
        assert_eq!(check.distance, 0.0);
        assert!(check.inside_geofence);
        assert!(check.is_valid);
    }

    #[test]
    fn test_far_point_is_outside() {
        let check = GeofenceValidator::default().validate(
            &LocationFix::new(point(1.4000, 103.9000), Some(5.0)),
            &fence(100.0, true, 0.0),
        );
        assert!(check.distance > 10_000.0);
        assert!(!check.inside_geofence);
        assert!(!check.is_valid);
        assert!(check.message.starts_with("Outside project geofence by"));
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let pairs = [
            (point(1.3521, 103.8198), point(1.4000, 103.9000)),
            (point(-33.8688, 151.2093), point(51.5074, -0.1278)),
            (point(89.9, 0.0), point(-89.9, 179.9)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude along a meridian.
        let d = haversine_distance(&point(0.0, 0.0), &point(1.0, 0.0));
        assert!((d - 111_194.93).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_inside_matches_radius_comparison() {
        let validator = GeofenceValidator::default();
        let fence = fence(100.0, false, 30.0);
        for meters in [0.0, 10.0, 50.0, 99.0, 101.0, 120.0, 200.0, 5_000.0] {
            let fix = LocationFix::new(north_of_center(meters), None);
            let check = validator.validate(&fix, &fence);
            assert_eq!(
                check.inside_geofence,
                haversine_distance(&fix.point, &fence.center) <= fence.radius_meters
            );
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let target = north_of_center(100.0);
        let exact = haversine_distance(&target, &point(1.3521, 103.8198));
        let fence = Geofence::new(point(1.3521, 103.8198), exact, true, 0.0).unwrap();
        let check = GeofenceValidator::default().validate(&LocationFix::new(target, None), &fence);
        assert!(check.inside_geofence);
        assert!(check.is_valid);
    }

    #[test]
    fn test_lenient_variance_allows_just_outside() {
        let check = GeofenceValidator::default().validate(
            &LocationFix::new(north_of_center(115.0), None),
            &fence(100.0, false, 25.0),
        );
        assert!(!check.inside_geofence);
        assert!(check.is_valid);
        assert!(check.message.starts_with("Within allowed variance"));
    }

    #[test]
    fn test_strict_ignores_variance() {
        let check = GeofenceValidator::default().validate(
            &LocationFix::new(north_of_center(115.0), None),
            &fence(100.0, true, 25.0),
        );
        assert!(!check.is_valid);
    }

    #[test]
    fn test_strict_poor_accuracy_is_not_valid() {
        let check = GeofenceValidator::new(30.0).validate(
            &LocationFix::new(north_of_center(10.0), Some(80.0)),
            &fence(100.0, true, 0.0),
        );
        assert!(check.inside_geofence);
        assert!(!check.is_valid);
        assert!(check.message.contains("GPS accuracy too low"));
        assert_eq!(check.accuracy, Some(80.0));
    }

    #[test]
    fn test_lenient_ignores_poor_accuracy() {
        let check = GeofenceValidator::new(30.0).validate(
            &LocationFix::new(north_of_center(10.0), Some(80.0)),
            &fence(100.0, false, 0.0),
        );
        assert!(check.is_valid);
    }

    #[test]
    fn test_unknown_accuracy_is_not_penalized() {
        let validator = GeofenceValidator::new(30.0);
        for accuracy in [Some(0.0), Some(-5.0), None] {
            let check = validator.validate(
                &LocationFix::new(north_of_center(10.0), accuracy),
                &fence(100.0, true, 0.0),
            );
            assert!(check.is_valid, "accuracy {:?} should be treated as unknown", accuracy);
        }
    }
}
