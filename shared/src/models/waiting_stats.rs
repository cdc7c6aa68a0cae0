//! Waiting statistics (排队统计)

use serde::{Deserialize, Serialize};

/// Counters for one venue-local day
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodayStats {
    pub day_key: String,
    /// All entries registered today, whatever their status
    pub total: i64,
    pub waiting: i64,
    pub called: i64,
    pub seated: i64,
    pub cancelled: i64,
    pub no_show: i64,
    /// Mean of `seated_at - created_at` over seated entries, rounded minutes
    pub avg_wait_minutes: i64,
}

/// Live snapshot of one queue lane
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeQueueStats {
    pub waiting_type_id: i64,
    pub name: String,
    /// WAITING + CALLED
    pub teams: i64,
    pub party_size_total: i64,
    pub estimated_minutes: i64,
}

/// Live snapshot of a venue
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveQueueStats {
    pub types: Vec<TypeQueueStats>,
    pub total_teams: i64,
    pub total_party_size: i64,
    /// Longest lane, not the sum
    pub estimated_minutes: i64,
}
