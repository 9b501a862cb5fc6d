//! HTTP notification dispatch.
//!
//! Implements the NotificationService trait by POSTing `createNotification`
//! requests to the notification backend configured under `[notifications]`.

use async_trait::async_trait;
use domain::services::{
    CreateNotificationRequest, NotificationError, NotificationReceipt, NotificationService,
};
use reqwest::Client;

use crate::config::NotificationsConfig;

/// Notification service backed by the notification HTTP API.
pub struct HttpNotificationService {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpNotificationService {
    /// Creates the client; every request is bounded by `timeout_ms`.
    pub fn new(config: &NotificationsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }
}

fn send_error(err: reqwest::Error) -> NotificationError {
    if err.is_timeout() {
        NotificationError::Timeout
    } else {
        NotificationError::Request(err.to_string())
    }
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<NotificationReceipt, NotificationError> {
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                notification_type = %request.notification_type,
                "Notification backend rejected request"
            );
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let receipt: NotificationReceipt = response.json().await.map_err(send_error)?;
        tracing::debug!(
            notification_type = %request.notification_type,
            recipients = request.recipients.len(),
            notifications = receipt.notifications.len(),
            "Notification dispatched"
        );
        Ok(receipt)
    }
}
