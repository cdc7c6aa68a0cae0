//! Waiting Entry Model (排队登记)

use serde::{Deserialize, Serialize};

/// Lifecycle status of a waiting entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum WaitingStatus {
    Waiting,
    Called,
    Seated,
    Cancelled,
    NoShow,
}

impl WaitingStatus {
    /// Statuses that occupy a place in the queue
    pub const ACTIVE: [WaitingStatus; 2] = [WaitingStatus::Waiting, WaitingStatus::Called];

    /// Statuses a Restore may start from
    pub const TERMINAL: [WaitingStatus; 3] = [
        WaitingStatus::Seated,
        WaitingStatus::Cancelled,
        WaitingStatus::NoShow,
    ];

    pub fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Called)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Staff list ordering: called parties first, then the queue, then history
    pub fn list_rank(self) -> u8 {
        match self {
            Self::Called => 0,
            Self::Waiting => 1,
            Self::Seated => 2,
            Self::Cancelled => 3,
            Self::NoShow => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Called => "CALLED",
            Self::Seated => "SEATED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }
}

impl std::fmt::Display for WaitingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an entry left the queue without being seated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CancelReason {
    CustomerRequest,
    StoreReason,
    OutOfStock,
    NoShow,
    AutoCancelled,
}

/// Notification grouping of cancel reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelGroup {
    /// Customer cancelled themselves
    Customer,
    /// Store reason / out of stock
    Store,
    /// No-show / call timeout
    Timeout,
}

impl CancelReason {
    pub fn group(self) -> CancelGroup {
        match self {
            Self::CustomerRequest => CancelGroup::Customer,
            Self::StoreReason | Self::OutOfStock => CancelGroup::Store,
            Self::NoShow | Self::AutoCancelled => CancelGroup::Timeout,
        }
    }

    /// Terminal status this reason leads to
    pub fn target_status(self) -> WaitingStatus {
        match self {
            Self::NoShow => WaitingStatus::NoShow,
            _ => WaitingStatus::Cancelled,
        }
    }
}

/// Where the registration came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum WaitingSource {
    Qr,
    #[default]
    Tablet,
    Manual,
}

/// Waiting entry entity
///
/// Timestamps are Unix millis. `day_key` is the venue-local registration day
/// (`YYYY-MM-DD`) and never changes, even when a deferral resets `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WaitingEntry {
    pub id: String,
    pub venue_id: i64,
    pub waiting_type_id: i64,
    /// Per venue, per local day
    pub waiting_number: i64,
    pub day_key: String,
    /// Digits only
    pub phone: Option<String>,
    pub phone_last_digits: Option<String>,
    pub name: Option<String>,
    pub party_size: i32,
    pub memo: Option<String>,
    pub source: WaitingSource,
    pub consent_marketing: bool,
    pub status: WaitingStatus,
    pub created_at: i64,
    pub called_at: Option<i64>,
    pub called_count: i32,
    pub call_expire_at: Option<i64>,
    pub seated_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub cancel_reason: Option<CancelReason>,
    pub is_deferred: bool,
    pub customer_id: Option<i64>,
    /// Snapshot taken at registration
    pub estimated_wait_minutes: i64,
    /// Optimistic concurrency token, bumped by every store write
    pub version: i64,
}

impl WaitingEntry {
    /// `seated_at` for SEATED, `cancelled_at` for CANCELLED / NO_SHOW
    pub fn completed_at(&self) -> Option<i64> {
        match self.status {
            WaitingStatus::Seated => self.seated_at,
            WaitingStatus::Cancelled | WaitingStatus::NoShow => self.cancelled_at,
            WaitingStatus::Waiting | WaitingStatus::Called => None,
        }
    }

    /// Display label, e.g. `"#12"`
    pub fn label(&self) -> String {
        format!("#{}", self.waiting_number)
    }
}

/// Register payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingRegistration {
    pub venue_id: i64,
    pub waiting_type_id: i64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub party_size: i32,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub source: WaitingSource,
    #[serde(default)]
    pub consent_marketing: bool,
}

/// Staff list query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitingListQuery {
    /// Empty = all statuses
    #[serde(default)]
    pub statuses: Vec<WaitingStatus>,
    pub waiting_type_id: Option<i64>,
    /// Restrict to a local day (`YYYY-MM-DD`); `None` = today
    pub day_key: Option<String>,
    /// 1-based
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

/// Entry as shown to staff, with its live position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingListItem {
    #[serde(flatten)]
    pub entry: WaitingEntry,
    /// `None` once the entry has left the queue
    pub position: Option<i64>,
}

/// Paginated staff list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingListPage {
    pub items: Vec<WaitingListItem>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Customer-facing status view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingStatusView {
    pub id: String,
    pub waiting_number: i64,
    pub status: WaitingStatus,
    pub waiting_type_id: i64,
    pub waiting_type_name: Option<String>,
    pub party_size: i32,
    pub position: Option<i64>,
    pub estimated_wait_minutes: i64,
    pub called_at: Option<i64>,
    pub call_expire_at: Option<i64>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&WaitingStatus::NoShow).unwrap();
        assert_eq!(json, "\"NO_SHOW\"");
        let back: WaitingStatus = serde_json::from_str("\"CALLED\"").unwrap();
        assert_eq!(back, WaitingStatus::Called);
    }

    #[test]
    fn test_cancel_reason_groups() {
        assert_eq!(CancelReason::CustomerRequest.group(), CancelGroup::Customer);
        assert_eq!(CancelReason::StoreReason.group(), CancelGroup::Store);
        assert_eq!(CancelReason::OutOfStock.group(), CancelGroup::Store);
        assert_eq!(CancelReason::NoShow.group(), CancelGroup::Timeout);
        assert_eq!(CancelReason::AutoCancelled.group(), CancelGroup::Timeout);
    }

    #[test]
    fn test_only_no_show_reason_maps_to_no_show_status() {
        assert_eq!(CancelReason::NoShow.target_status(), WaitingStatus::NoShow);
        assert_eq!(
            CancelReason::AutoCancelled.target_status(),
            WaitingStatus::Cancelled
        );
        assert_eq!(
            CancelReason::CustomerRequest.target_status(),
            WaitingStatus::Cancelled
        );
    }

    #[test]
    fn test_list_rank_puts_called_first() {
        let mut statuses = vec![
            WaitingStatus::NoShow,
            WaitingStatus::Waiting,
            WaitingStatus::Seated,
            WaitingStatus::Called,
            WaitingStatus::Cancelled,
        ];
        statuses.sort_by_key(|s| s.list_rank());
        assert_eq!(
            statuses,
            vec![
                WaitingStatus::Called,
                WaitingStatus::Waiting,
                WaitingStatus::Seated,
                WaitingStatus::Cancelled,
                WaitingStatus::NoShow,
            ]
        );
    }

    #[test]
    fn test_registration_defaults() {
        let reg: WaitingRegistration =
            serde_json::from_str(r#"{"venue_id":1,"waiting_type_id":2,"party_size":3}"#).unwrap();
        assert_eq!(reg.source, WaitingSource::Tablet);
        assert!(!reg.consent_marketing);
        assert!(reg.phone.is_none());
    }
}
