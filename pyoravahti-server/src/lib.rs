//! Pyörävahti Server Library - REST API for bike reports, matching and search
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod notify;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod storage;
pub mod validation;

pub use auth::{AdminAccess, ADMIN_TOKEN_HEADER};
pub use config::Config;
pub use error::ApiError;
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier, NotifyError};
pub use openapi::ApiDoc;
pub use rate_limit::ReportRateLimiter;
pub use routes::{create_router, create_router_with_config, create_router_with_state};
pub use state::AppState;
pub use storage::ImageStorage;
