//! Employee directory model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee as seen by the attendance core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
}

/// Contact details of a supervisor included in alert payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorContact {
    pub supervisor_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl SupervisorContact {
    /// Contact used when the supervisor cannot be resolved.
    pub fn placeholder(supervisor_id: Option<Uuid>) -> Self {
        Self {
            supervisor_id,
            name: "Supervisor".to_string(),
            phone: "N/A".to_string(),
            email: "N/A".to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == "Supervisor" && self.phone == "N/A" && self.email == "N/A"
    }
}

impl From<Employee> for SupervisorContact {
    fn from(e: Employee) -> Self {
        Self {
            supervisor_id: Some(e.employee_id),
            name: e.display_name,
            phone: e.phone.unwrap_or_else(|| "N/A".to_string()),
            email: e.email.unwrap_or_else(|| "N/A".to_string()),
        }
    }
}
