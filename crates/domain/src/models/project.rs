//! Project site model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geofence::Geofence;

/// Project name used in alerts when the project cannot be resolved.
pub const UNKNOWN_PROJECT_NAME: &str = "N/A";

/// A construction project and its attendance boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub geofence: Geofence,
    pub active: bool,
}
