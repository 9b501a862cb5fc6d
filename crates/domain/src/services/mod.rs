//! Domain services for site attendance.
//!
//! Services contain business logic that operates on domain models.

pub mod alerts;
pub mod attendance;
pub mod clock;
pub mod geofence;
pub mod in_memory;
pub mod notification;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

pub use alerts::{
    evaluate, AlertCandidate, AlertEngine, AlertOutcome, AlertPassError, AlertPassReport,
    AlertRules,
};
pub use attendance::{AttendanceError, AttendanceService, Caller, PunchOutcome};
pub use clock::{Clock, ShiftedClock, SystemClock};
pub use geofence::{haversine_distance, GeofenceCheck, GeofenceValidator, LocationFix};
pub use in_memory::InMemoryStore;
pub use notification::{
    CreateNotificationRequest, MockNotificationService, NotificationError, NotificationReceipt,
    NotificationService,
};
pub use store::{AssignmentStore, AttendanceStore, EmployeeDirectory, ProjectCatalog, StoreError};

/// External collaborators shared by the attendance and alert services.
#[derive(Clone)]
pub struct Collaborators {
    pub records: Arc<dyn AttendanceStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub projects: Arc<dyn ProjectCatalog>,
    pub notifications: Arc<dyn NotificationService>,
}

impl Collaborators {
    /// Uses one store for every table.
    pub fn from_store<S>(store: Arc<S>, notifications: Arc<dyn NotificationService>) -> Self
    where
        S: AttendanceStore + AssignmentStore + EmployeeDirectory + ProjectCatalog + 'static,
    {
        Self {
            records: store.clone(),
            assignments: store.clone(),
            employees: store.clone(),
            projects: store,
            notifications,
        }
    }
}

/// Timeouts and locale shared by the services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Deadline of every store call.
    pub store_timeout: Duration,
    /// Deadline of one notification dispatch.
    pub notification_timeout: Duration,
    /// Fixed offset of the sites' wall clock; defines the work date.
    pub utc_offset: FixedOffset,
    pub language: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            notification_timeout: Duration::from_secs(5),
            utc_offset: Utc.fix(),
            language: notification::DEFAULT_LANGUAGE.to_string(),
        }
    }
}
