//! Support ticket intake

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use studyhub_common::time;
use tracing::info;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{is_plausible_email, SupportQueryRequest};
use crate::AppState;

use super::required;

/// POST /api/support
///
/// Open to anonymous visitors.
pub async fn submit_query(
    State(state): State<AppState>,
    Json(req): Json<SupportQueryRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = required("name", req.name.as_deref())?;
    let email = required("email", req.email.as_deref())?;
    if !is_plausible_email(email) {
        return Err(ApiError::field("email", "Enter a valid email address."));
    }
    let subject = required("subject", req.subject.as_deref())?;
    let message = required("message", req.message.as_deref())?;

    let id = db::support::insert(&state.db, name, email, subject, message, time::now()).await?;
    info!(query_id = id, "Support query received");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Your query has been submitted successfully" })),
    ))
}

/// Build support routes
pub fn support_routes() -> Router<AppState> {
    Router::new().route("/support", post(submit_query))
}
