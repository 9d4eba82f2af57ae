//! Request identity
//!
//! Authentication happens upstream. The identity provider forwards the
//! authenticated user id in the `X-User-Id` header; handlers that need an
//! identity take an [`Actor`] argument, public handlers simply omit it.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::db;
use crate::error::ApiError;
use crate::models::Actor;
use crate::AppState;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Parse the user id header value
fn parse_user_id(parts: &Parts) -> Result<i64, ApiError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("Authentication credentials were not provided".to_string()))?;

    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::Unauthorized("Malformed user id header".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parse_user_id(parts)?;

        match db::users::find_actor(&state.db, user_id).await? {
            Some(actor) => Ok(actor),
            None => {
                debug!(user_id, "Rejected request for unknown user");
                Err(ApiError::Unauthorized(format!("Unknown user {}", user_id)))
            }
        }
    }
}
