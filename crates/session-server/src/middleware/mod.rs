//! Middleware for the session server.

mod timing;

pub use timing::timing_layer;
