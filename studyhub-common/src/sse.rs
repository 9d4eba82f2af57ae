//! Server-Sent Events (SSE) utilities
//!
//! Per-user live channel backed by the [`EventBus`].

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::EventBus;

/// Heartbeat period for idle streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream of the events visible to `user_id`
///
/// Sends a `ConnectionStatus` event first, then forwards every bus event that
/// passes [`crate::events::PlatformEvent::is_visible_to`]. Lagged receivers
/// skip the dropped events and keep streaming.
///
/// # Example
/// ```rust,ignore
/// pub async fn notification_stream(
///     State(state): State<AppState>,
///     actor: Actor,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     studyhub_common::sse::user_event_sse_stream(&state.event_bus, actor.id)
/// }
/// ```
pub fn user_event_sse_stream(
    event_bus: &EventBus,
    user_id: i64,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(user_id, "New SSE client connected to notification events");

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            if !event.is_visible_to(user_id) {
                                continue;
                            }
                            let event_type = event.event_type().to_string();
                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    debug!(user_id, "SSE: Forwarding {}", event_type);
                                    yield Ok(Event::default()
                                        .event(event_type)
                                        .data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                                }
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(user_id, skipped, "SSE: Subscriber lagged, events dropped");
                        }
                        Err(RecvError::Closed) => {
                            info!(user_id, "SSE: Event bus closed, ending stream");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
