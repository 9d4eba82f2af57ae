//! Stored notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studyhub_common::db::NotificationType;
use studyhub_common::events::NotificationPayload;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationPayload {
    fn from(n: &Notification) -> Self {
        NotificationPayload {
            id: n.id,
            notification_type: n.notification_type,
            title: n.title.clone(),
            message: n.message.clone(),
            link: n.link.clone(),
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    pub unread: Option<bool>,
}
