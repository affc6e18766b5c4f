//! Axum HTTP API server.
//!
//! This crate exposes the studio workflow over HTTP:
//! - recording registration and slot positioning
//! - clip extraction start/status
//! - render submit/status
//! - completion webhook for an external render watcher

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
