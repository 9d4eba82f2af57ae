//! Payload types carried by platform events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::NotificationType;

/// Notification as delivered to a recipient's live channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Persisted notification id
    pub id: i64,
    /// Notification category
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// Client-side route to open, may be empty
    pub link: String,
    pub created_at: DateTime<Utc>,
}
