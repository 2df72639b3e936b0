//! Core C-Money client library (session, authenticated API client, routing, resources).

pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod router;
pub mod session;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use session::{Session, SessionManager};
