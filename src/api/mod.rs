//! API module for HTTP endpoints
//!
//! JSON endpoints that run feed cycles and return the rendered feed.

pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
