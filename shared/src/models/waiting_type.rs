//! Waiting Type Model (排队类型)

use serde::{Deserialize, Serialize};

/// A queue lane, e.g. "2-seat table" or "terrace"
///
/// Maintained by staff; read-only to the queue engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WaitingType {
    pub id: i64,
    pub venue_id: i64,
    pub name: String,
    /// Minutes per team ahead in the queue
    pub avg_wait_time_per_team: i32,
    pub is_active: bool,
    pub sort_order: i32,
}
