//! Persistence queries
//!
//! Plain `sqlx` queries against the schema created by
//! `studyhub_common::db::init_schema`. Functions return
//! `studyhub_common::Result` and leave HTTP mapping to the callers.

pub mod forum;
pub mod materials;
pub mod notifications;
pub mod reviews;
pub mod sessions;
pub mod subjects;
pub mod support;
pub mod users;
