//! Data models
//!
//! Shared between the waiting engine and whatever surface exposes it.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Venue / type / customer IDs are `i64`; entry IDs are opaque strings.

pub mod waiting_entry;
pub mod waiting_setting;
pub mod waiting_stats;
pub mod waiting_type;

// Re-exports
pub use waiting_entry::*;
pub use waiting_setting::*;
pub use waiting_stats::*;
pub use waiting_type::*;
