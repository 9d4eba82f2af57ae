//! # StudyHub Common Library
//!
//! Shared code for the StudyHub services including:
//! - Database initialization, schema and migrations
//! - Event types (PlatformEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - SSE helpers
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
