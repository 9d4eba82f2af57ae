//! Resource representations and request bodies

pub mod forum;
pub mod material;
pub mod notification;
pub mod session;
pub mod support;
pub mod user;

pub use forum::*;
pub use material::*;
pub use notification::*;
pub use session::*;
pub use support::*;
pub use user::*;
