//! Shared types for the canteen ordering backend
//!
//! Common types used across server and client crates: error codes,
//! response structures, data models, and ID/time utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
