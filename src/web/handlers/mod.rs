//! API handlers for the panel.

pub mod auth;
pub mod panel;

pub use auth::*;
pub use panel::*;
