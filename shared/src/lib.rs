//! Shared types for the dispatch core
//!
//! Data models and the unified error system, used by the service crate and
//! by any outer API layer.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
