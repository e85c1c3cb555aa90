//! REST handlers for the session server.

pub mod sessions;
pub mod strategies;
