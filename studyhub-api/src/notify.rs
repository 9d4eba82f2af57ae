//! Fire-and-forget notification dispatch
//!
//! Stores the notification for the recipient and pushes it onto the event
//! bus for live SSE delivery. Failures are logged and swallowed so the
//! triggering operation always completes.

use studyhub_common::db::NotificationType;
use studyhub_common::events::PlatformEvent;
use studyhub_common::time;
use tracing::{debug, warn};

use crate::db;
use crate::AppState;

/// Content of one notification
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: String,
}

impl Notice {
    pub fn new(
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            link: link.into(),
        }
    }
}

/// Deliver `notice` to one user
pub async fn send(state: &AppState, recipient_id: i64, notice: &Notice) {
    let stored = db::notifications::insert(
        &state.db,
        recipient_id,
        notice.kind,
        &notice.title,
        &notice.message,
        &notice.link,
        time::now(),
    )
    .await;

    match stored {
        Ok(notification) => {
            debug!(recipient = recipient_id, kind = ?notice.kind, "Notification stored");
            state.event_bus.emit_lossy(PlatformEvent::NotificationCreated {
                recipient_id,
                notification: (&notification).into(),
            });
        }
        Err(e) => {
            warn!(recipient = recipient_id, kind = ?notice.kind, "Failed to store notification: {}", e);
        }
    }
}

/// Deliver `notice` to several users, skipping `exclude` and duplicates
pub async fn send_many(state: &AppState, recipients: &[i64], exclude: i64, notice: &Notice) {
    let mut seen = Vec::with_capacity(recipients.len());
    for &recipient in recipients {
        if recipient == exclude || seen.contains(&recipient) {
            continue;
        }
        seen.push(recipient);
        send(state, recipient, notice).await;
    }
}

/// Deliver `notice` to every user affiliated with `subject_id` except `exclude`
///
/// A failed recipient lookup is logged and the notice is dropped.
pub async fn send_to_subject(state: &AppState, subject_id: i64, exclude: i64, notice: &Notice) {
    match db::users::affiliated_with(&state.db, subject_id).await {
        Ok(recipients) => send_many(state, &recipients, exclude, notice).await,
        Err(e) => {
            warn!(subject = subject_id, kind = ?notice.kind, "Failed to look up subject audience: {}", e);
        }
    }
}
