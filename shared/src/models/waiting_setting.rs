//! Waiting Setting Model (排队设置)

use serde::{Deserialize, Serialize};

/// Venue operating mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OperationStatus {
    #[default]
    Closed,
    Paused,
    /// Tables free, no queue needed
    WalkIn,
    Accepting,
}

pub const MAX_WAITING_COUNT_RANGE: std::ops::RangeInclusive<i32> = 1..=999;
pub const CALL_TIMEOUT_MINUTES_RANGE: std::ops::RangeInclusive<i32> = 1..=30;
pub const MAX_CALL_COUNT_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

/// Per-venue waiting configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WaitingSetting {
    pub venue_id: i64,
    pub operation_status: OperationStatus,
    pub max_waiting_count: i32,
    pub call_timeout_minutes: i32,
    pub max_call_count: i32,
    pub auto_cancel: bool,
    /// Shown to customers on registration
    pub waiting_note: Option<String>,
    /// Sent with call notifications
    pub waiting_call_note: Option<String>,
    /// Shown while paused
    pub pause_message: Option<String>,
}

impl WaitingSetting {
    /// Default setting for a venue that has never configured waiting
    pub fn new(venue_id: i64) -> Self {
        Self {
            venue_id,
            operation_status: OperationStatus::Closed,
            max_waiting_count: 50,
            call_timeout_minutes: 3,
            max_call_count: 2,
            auto_cancel: true,
            waiting_note: None,
            waiting_call_note: None,
            pause_message: None,
        }
    }

    /// Range checks applied when staff save a setting.
    ///
    /// Returns the offending field name and a message.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if !MAX_WAITING_COUNT_RANGE.contains(&self.max_waiting_count) {
            return Err((
                "max_waiting_count",
                format!(
                    "max_waiting_count must be between {} and {}",
                    MAX_WAITING_COUNT_RANGE.start(),
                    MAX_WAITING_COUNT_RANGE.end()
                ),
            ));
        }
        if !CALL_TIMEOUT_MINUTES_RANGE.contains(&self.call_timeout_minutes) {
            return Err((
                "call_timeout_minutes",
                format!(
                    "call_timeout_minutes must be between {} and {}",
                    CALL_TIMEOUT_MINUTES_RANGE.start(),
                    CALL_TIMEOUT_MINUTES_RANGE.end()
                ),
            ));
        }
        if !MAX_CALL_COUNT_RANGE.contains(&self.max_call_count) {
            return Err((
                "max_call_count",
                format!(
                    "max_call_count must be between {} and {}",
                    MAX_CALL_COUNT_RANGE.start(),
                    MAX_CALL_COUNT_RANGE.end()
                ),
            ));
        }
        Ok(())
    }

    /// Call timeout in milliseconds
    pub fn call_timeout_millis(&self) -> i64 {
        i64::from(self.call_timeout_minutes) * 60_000
    }
}
