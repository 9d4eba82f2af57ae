//! Event types for the StudyHub event system
//!
//! Provides shared event definitions and the EventBus used to fan events out
//! to live SSE subscribers.

mod notification_types;

pub use notification_types::NotificationPayload;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::models::SessionStatus;

/// Platform event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Every event names the users allowed to see it; subscribers filter on
/// [`PlatformEvent::is_visible_to`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlatformEvent {
    /// A notification was stored for a user
    ///
    /// Triggers:
    /// - SSE: push to the recipient's notification stream
    NotificationCreated {
        /// Recipient user id
        recipient_id: i64,
        notification: NotificationPayload,
    },

    /// A tutoring session changed lifecycle state
    ///
    /// Triggers:
    /// - SSE: refresh session views of both participants
    SessionStatusChanged {
        session_id: i64,
        tutor_id: i64,
        student_id: Option<i64>,
        old_status: SessionStatus,
        new_status: SessionStatus,
        /// User who caused the transition
        actor_id: i64,
        timestamp: DateTime<Utc>,
    },
}

impl PlatformEvent {
    /// Get event type as string for SSE `event:` lines
    pub fn event_type(&self) -> &str {
        match self {
            PlatformEvent::NotificationCreated { .. } => "NotificationCreated",
            PlatformEvent::SessionStatusChanged { .. } => "SessionStatusChanged",
        }
    }

    /// Whether `user_id` may receive this event
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        match self {
            PlatformEvent::NotificationCreated { recipient_id, .. } => *recipient_id == user_id,
            PlatformEvent::SessionStatusChanged {
                tutor_id,
                student_id,
                ..
            } => *tutor_id == user_id || *student_id == Some(user_id),
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use studyhub_common::events::{EventBus, PlatformEvent};
/// use studyhub_common::db::SessionStatus;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlatformEvent::SessionStatusChanged {
///     session_id: 1,
///     tutor_id: 2,
///     student_id: Some(3),
///     old_status: SessionStatus::Pending,
///     new_status: SessionStatus::Scheduled,
///     actor_id: 2,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlatformEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers
    ///   start dropping old events. Tests use 10-100, servers ~1000.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlatformEvent,
    ) -> Result<usize, broadcast::error::SendError<PlatformEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Live delivery is best effort: nobody connected is not an error.
    pub fn emit_lossy(&self, event: PlatformEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
