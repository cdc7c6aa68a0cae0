//! Shared types for the waiting-list engine
//!
//! Common types used by the engine crate and by whatever surface exposes it
//! (HTTP layer, tablet client): waiting models, the unified error-code system
//! and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
