//! HTTP API handlers
//!
//! Each submodule exposes a `*_routes()` builder. All routes except
//! `/health` are nested under `/api` by [`crate::build_router`].

pub mod auth;
pub mod forum;
pub mod health;
pub mod materials;
pub mod notifications;
pub mod sessions;
pub mod support;
pub mod users;

pub use forum::forum_routes;
pub use health::health_routes;
pub use materials::material_routes;
pub use notifications::notification_routes;
pub use sessions::session_routes;
pub use support::support_routes;
pub use users::user_routes;

use crate::error::{ApiError, ApiResult};

/// Trimmed value of a mandatory text field
pub(crate) fn required<'a>(field: &'static str, value: Option<&'a str>) -> ApiResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::field(field, "This field is required.")),
    }
}
