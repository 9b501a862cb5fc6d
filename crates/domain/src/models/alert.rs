//! Alert request model handed to notification dispatch.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of attendance alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    MissedLogin,
    MissedLogout,
    LunchBreakReminder,
    OvertimeStart,
    GeofenceViolation,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::MissedLogin => "MISSED_LOGIN",
            AlertType::MissedLogout => "MISSED_LOGOUT",
            AlertType::LunchBreakReminder => "LUNCH_BREAK_REMINDER",
            AlertType::OvertimeStart => "OVERTIME_START",
            AlertType::GeofenceViolation => "GEOFENCE_VIOLATION",
        }
    }

    pub fn priority(&self) -> AlertPriority {
        match self {
            AlertType::MissedLogin | AlertType::MissedLogout | AlertType::GeofenceViolation => {
                AlertPriority::High
            }
            AlertType::LunchBreakReminder | AlertType::OvertimeStart => AlertPriority::Normal,
        }
    }

    pub fn requires_acknowledgment(&self) -> bool {
        self.priority() == AlertPriority::High
    }

    /// Whether the supervisor is a recipient besides the worker.
    pub fn notifies_supervisor(&self) -> bool {
        !matches!(self, AlertType::LunchBreakReminder)
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertType::MissedLogin => "Missed Login Alert",
            AlertType::MissedLogout => "Missed Logout Alert",
            AlertType::LunchBreakReminder => "Lunch Break Reminder",
            AlertType::OvertimeStart => "Overtime Started",
            AlertType::GeofenceViolation => "Geofence Violation",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    High,
    Normal,
}

/// A fully resolved alert, ready to hand to notification dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    pub alert_type: AlertType,
    pub worker_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub project_id: Uuid,
    pub priority: AlertPriority,
    pub requires_acknowledgment: bool,
    pub message: String,
    pub payload: serde_json::Value,
}

impl AlertRequest {
    /// Builds a request with the priority and acknowledgment policy of its type.
    pub fn new(
        alert_type: AlertType,
        worker_id: Uuid,
        supervisor_id: Option<Uuid>,
        project_id: Uuid,
        message: String,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            alert_type,
            worker_id,
            supervisor_id,
            project_id,
            priority: alert_type.priority(),
            requires_acknowledgment: alert_type.requires_acknowledgment(),
            message,
            payload,
        }
    }

    /// Recipients: the worker, plus the supervisor when the type calls for it.
    pub fn recipients(&self) -> Vec<Uuid> {
        let mut recipients = vec![self.worker_id];
        if self.alert_type.notifies_supervisor() {
            if let Some(supervisor_id) = self.supervisor_id {
                if supervisor_id != self.worker_id {
                    recipients.push(supervisor_id);
                }
            }
        }
        recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_policy() {
        assert_eq!(AlertType::MissedLogin.priority(), AlertPriority::High);
        assert!(AlertType::MissedLogout.requires_acknowledgment());
        assert_eq!(AlertType::LunchBreakReminder.priority(), AlertPriority::Normal);
        assert!(!AlertType::LunchBreakReminder.requires_acknowledgment());
        assert_eq!(AlertType::OvertimeStart.priority(), AlertPriority::Normal);
        assert!(AlertType::GeofenceViolation.requires_acknowledgment());
    }

    #[test]
    fn test_alert_type_serialization() {
        assert_eq!(
            serde_json::to_string(&AlertType::LunchBreakReminder).unwrap(),
            "\"LUNCH_BREAK_REMINDER\""
        );
        assert_eq!(AlertType::MissedLogin.to_string(), "MISSED_LOGIN");
    }

    #[test]
    fn test_recipients() {
        let worker = Uuid::new_v4();
        let supervisor = Uuid::new_v4();

        let login = AlertRequest::new(
            AlertType::MissedLogin,
            worker,
            Some(supervisor),
            Uuid::new_v4(),
            String::new(),
            serde_json::json!({}),
        );
        assert_eq!(login.recipients(), vec![worker, supervisor]);

        let lunch = AlertRequest::new(
            AlertType::LunchBreakReminder,
            worker,
            Some(supervisor),
            Uuid::new_v4(),
            String::new(),
            serde_json::json!({}),
        );
        assert_eq!(lunch.recipients(), vec![worker]);

        let unsupervised = AlertRequest::new(
            AlertType::MissedLogout,
            worker,
            None,
            Uuid::new_v4(),
            String::new(),
            serde_json::json!({}),
        );
        assert_eq!(unsupervised.recipients(), vec![worker]);
    }
}
