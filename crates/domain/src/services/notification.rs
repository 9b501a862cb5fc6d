//! Notification dispatch boundary.
//!
//! The attendance core builds [`CreateNotificationRequest`]s and hands them
//! to a [`NotificationService`]. Delivery, audit and de-duplication belong to
//! the implementation behind the trait.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AlertPriority, AlertRequest, AlertType};

/// Default language of alert texts.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Errors returned by a notification backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotificationError {
    #[error("notification request failed: {0}")]
    Request(String),

    #[error("notification backend rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification request timed out")]
    Timeout,
}

/// Body of the `createNotification` contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: AlertType,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub sender_id: Option<Uuid>,
    pub recipients: Vec<Uuid>,
    pub action_data: serde_json::Value,
    pub requires_acknowledgment: bool,
    pub language: String,
}

impl CreateNotificationRequest {
    /// Builds the dispatch request for an alert. Alerts are system generated
    /// and carry no sender.
    pub fn from_alert(alert: &AlertRequest, language: &str) -> Self {
        let mut action_data = alert.payload.clone();
        if let Some(map) = action_data.as_object_mut() {
            map.insert("workerId".to_string(), alert.worker_id.to_string().into());
            map.insert("projectId".to_string(), alert.project_id.to_string().into());
        }

        Self {
            notification_type: alert.alert_type,
            priority: alert.priority,
            title: alert.alert_type.title().to_string(),
            message: alert.message.clone(),
            sender_id: None,
            recipients: alert.recipients(),
            action_data,
            requires_acknowledgment: alert.requires_acknowledgment,
            language: language.to_string(),
        }
    }
}

/// What the backend created for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReceipt {
    #[serde(default)]
    pub notifications: Vec<Uuid>,
    #[serde(default)]
    pub audit_records: Vec<Uuid>,
}

#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<NotificationReceipt, NotificationError>;
}

/// Mock notification service for development and testing.
///
/// Logs and records requests instead of delivering them.
#[derive(Debug, Default)]
pub struct MockNotificationService {
    simulate_failure: bool,
    failing_recipient: Option<Uuid>,
    sent: Mutex<Vec<CreateNotificationRequest>>,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails every request.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// A mock that fails only requests addressed to `recipient`.
    pub fn failing_for(recipient: Uuid) -> Self {
        Self {
            failing_recipient: Some(recipient),
            ..Self::default()
        }
    }

    /// Requests accepted so far.
    pub fn sent(&self) -> Vec<CreateNotificationRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_of_type(&self, notification_type: AlertType) -> Vec<CreateNotificationRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.notification_type == notification_type)
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationService for MockNotificationService {
    async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<NotificationReceipt, NotificationError> {
        let targeted = self
            .failing_recipient
            .is_some_and(|id| request.recipients.contains(&id));
        if self.simulate_failure || targeted {
            tracing::warn!(
                notification_type = %request.notification_type,
                recipients = request.recipients.len(),
                "Mock notification service simulating failure"
            );
            return Err(NotificationError::Request("Simulated failure".to_string()));
        }

        tracing::info!(
            notification_type = %request.notification_type,
            recipients = request.recipients.len(),
            requires_acknowledgment = request.requires_acknowledgment,
            "Mock: Would send notification"
        );

        let receipt = NotificationReceipt {
            notifications: request.recipients.iter().map(|_| Uuid::new_v4()).collect(),
            audit_records: vec![Uuid::new_v4()],
        };
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(alert_type: AlertType, supervisor: Option<Uuid>) -> AlertRequest {
        AlertRequest::new(
            alert_type,
            Uuid::new_v4(),
            supervisor,
            Uuid::new_v4(),
            "Worker has not clocked in".to_string(),
            serde_json::json!({ "projectName": "Marina Tower" }),
        )
    }

    #[test]
    fn test_request_from_alert() {
        let supervisor = Uuid::new_v4();
        let alert = alert(AlertType::MissedLogin, Some(supervisor));
        let request = CreateNotificationRequest::from_alert(&alert, DEFAULT_LANGUAGE);

        assert_eq!(request.title, "Missed Login Alert");
        assert_eq!(request.priority, AlertPriority::High);
        assert!(request.requires_acknowledgment);
        assert_eq!(request.recipients, vec![alert.worker_id, supervisor]);
        assert_eq!(request.sender_id, None);
        assert_eq!(request.action_data["projectName"], "Marina Tower");
        assert_eq!(request.action_data["workerId"], alert.worker_id.to_string());
    }

    #[test]
    fn test_request_serialization() {
        let request =
            CreateNotificationRequest::from_alert(&alert(AlertType::OvertimeStart, None), "en");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "OVERTIME_START");
        assert_eq!(json["priority"], "NORMAL");
        assert_eq!(json["requiresAcknowledgment"], false);
        assert!(json.get("actionData").is_some());
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let service = MockNotificationService::new();
        let request =
            CreateNotificationRequest::from_alert(&alert(AlertType::MissedLogout, None), "en");

        let receipt = service.create_notification(request.clone()).await.unwrap();
        assert_eq!(receipt.notifications.len(), 1);
        assert_eq!(service.sent(), vec![request]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let service = MockNotificationService::failing();
        let request =
            CreateNotificationRequest::from_alert(&alert(AlertType::MissedLogout, None), "en");

        assert!(service.create_notification(request).await.is_err());
        assert!(service.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mock_targeted_failure() {
        let alert = alert(AlertType::LunchBreakReminder, None);
        let service = MockNotificationService::failing_for(alert.worker_id);

        let request = CreateNotificationRequest::from_alert(&alert, "en");
        assert!(service.create_notification(request).await.is_err());

        let other = CreateNotificationRequest::from_alert(
            &self::alert(AlertType::LunchBreakReminder, None),
            "en",
        );
        assert!(service.create_notification(other).await.is_ok());
    }
}
