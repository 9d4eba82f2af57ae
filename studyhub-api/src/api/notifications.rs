//! Notification inbox and live stream

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Actor, Notification, NotificationFilter};
use crate::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<NotificationFilter>,
) -> ApiResult<Json<Vec<Notification>>> {
    let unread_only = filter.unread.unwrap_or(false);
    Ok(Json(
        db::notifications::list_for_user(&state.db, actor.id, unread_only).await?,
    ))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !db::notifications::mark_read(&state.db, actor.id, id).await? {
        return Err(ApiError::NotFound(format!("Notification {} not found", id)));
    }
    Ok(Json(json!({ "status": "notification marked as read" })))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let updated = db::notifications::mark_all_read(&state.db, actor.id).await?;
    Ok(Json(json!({
        "status": "all notifications marked as read",
        "updated": updated,
    })))
}

/// GET /api/notifications/stream
///
/// SSE stream of the actor's own notifications and session transitions.
pub async fn notification_stream(
    State(state): State<AppState>,
    actor: Actor,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    studyhub_common::sse::user_event_sse_stream(&state.event_bus, actor.id)
}

/// Build notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/stream", get(notification_stream))
        .route("/notifications/:id/read", post(mark_read))
}
