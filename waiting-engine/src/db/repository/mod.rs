//! Repository Module
//!
//! The queue store is the single source of truth for waiting entries, venue
//! settings and waiting types. The engine only talks to [`QueueStore`];
//! [`MemoryQueueStore`] and [`SqliteQueueStore`] implement it.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryQueueStore;
pub use sqlite::SqliteQueueStore;

use async_trait::async_trait;
use shared::models::{WaitingEntry, WaitingSetting, WaitingStatus, WaitingType};
use std::cmp::Ordering;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Optimistic version check failed
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Entry query filter
///
/// Every `Some` / non-empty field narrows the result; an empty filter matches
/// every entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub venue_id: Option<i64>,
    pub waiting_type_id: Option<i64>,
    /// Empty = any status
    pub statuses: Vec<WaitingStatus>,
    /// Normalized phone
    pub phone: Option<String>,
    pub day_key: Option<String>,
    /// `call_expire_at <= t` (entries with no expiry never match)
    pub call_expired_at_or_before: Option<i64>,
    /// Queue order strictly before `(created_at, waiting_number)`
    pub created_before: Option<(i64, i64)>,
}

impl EntryFilter {
    pub fn venue(venue_id: i64) -> Self {
        Self {
            venue_id: Some(venue_id),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, waiting_type_id: i64) -> Self {
        self.waiting_type_id = Some(waiting_type_id);
        self
    }

    pub fn with_statuses(mut self, statuses: &[WaitingStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// WAITING or CALLED
    pub fn active(self) -> Self {
        self.with_statuses(&WaitingStatus::ACTIVE)
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn on_day(mut self, day_key: impl Into<String>) -> Self {
        self.day_key = Some(day_key.into());
        self
    }

    pub fn call_expired_by(mut self, now_millis: i64) -> Self {
        self.call_expired_at_or_before = Some(now_millis);
        self
    }

    /// Entries queued ahead of `entry`
    pub fn ahead_of(mut self, entry: &WaitingEntry) -> Self {
        self.created_before = Some((entry.created_at, entry.waiting_number));
        self
    }

    /// In-process evaluation of the filter
    pub fn matches(&self, e: &WaitingEntry) -> bool {
        if self.venue_id.is_some_and(|v| v != e.venue_id) {
            return false;
        }
        if self.waiting_type_id.is_some_and(|t| t != e.waiting_type_id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&e.status) {
            return false;
        }
        if let Some(phone) = &self.phone
            && e.phone.as_deref() != Some(phone.as_str())
        {
            return false;
        }
        if let Some(day) = &self.day_key
            && e.day_key != *day
        {
            return false;
        }
        if let Some(t) = self.call_expired_at_or_before
            && !e.call_expire_at.is_some_and(|exp| exp <= t)
        {
            return false;
        }
        if let Some(key) = self.created_before
            && (e.created_at, e.waiting_number) >= key
        {
            return false;
        }
        true
    }
}

/// Entry list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrder {
    /// Queue order: `created_at`, then `waiting_number`
    CreatedAsc,
    CreatedDesc,
    WaitingNumberDesc,
    /// Staff list: CALLED, WAITING, SEATED, CANCELLED, NO_SHOW, then queue order
    StatusThenCreated,
}

impl EntryOrder {
    pub fn compare(self, a: &WaitingEntry, b: &WaitingEntry) -> Ordering {
        let queue = |x: &WaitingEntry| (x.created_at, x.waiting_number);
        match self {
            EntryOrder::CreatedAsc => queue(a).cmp(&queue(b)),
            EntryOrder::CreatedDesc => queue(b).cmp(&queue(a)),
            EntryOrder::WaitingNumberDesc => b.waiting_number.cmp(&a.waiting_number),
            EntryOrder::StatusThenCreated => (a.status.list_rank(), queue(a))
                .cmp(&(b.status.list_rank(), queue(b))),
        }
    }
}

/// Page window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    /// `None` = unbounded
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Window {
    pub const ALL: Window = Window {
        limit: None,
        offset: 0,
    };

    pub fn first(n: i64) -> Self {
        Self {
            limit: Some(n),
            offset: 0,
        }
    }

    /// 1-based page
    pub fn page(page: u32, page_size: u32) -> Self {
        let size = i64::from(page_size.max(1));
        Self {
            limit: Some(size),
            offset: i64::from(page.max(1) - 1) * size,
        }
    }
}

/// Persistence contract of the queue engine
///
/// `update_entry` is a compare-and-set on `version`: it succeeds only when the
/// stored version equals `expected_version`, and returns the entry with the
/// bumped version. `create_entry` enforces uniqueness of
/// `(venue_id, day_key, waiting_number)`; `create_entry_numbered` also picks
/// the number, reading the day's max and inserting as one atomic step.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn get_entry(&self, id: &str) -> RepoResult<Option<WaitingEntry>>;

    async fn create_entry(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry>;

    /// Insert with `waiting_number = max + 1` for the entry's venue and day.
    /// The incoming `waiting_number` is ignored.
    async fn create_entry_numbered(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry>;

    async fn update_entry(
        &self,
        entry: &WaitingEntry,
        expected_version: i64,
    ) -> RepoResult<WaitingEntry>;

    async fn count_entries(&self, filter: &EntryFilter) -> RepoResult<i64>;

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        order: EntryOrder,
        window: Window,
    ) -> RepoResult<Vec<WaitingEntry>>;

    /// Highest number issued for the venue on `day_key`, 0 if none
    async fn max_waiting_number(&self, venue_id: i64, day_key: &str) -> RepoResult<i64>;

    async fn get_setting(&self, venue_id: i64) -> RepoResult<Option<WaitingSetting>>;

    async fn get_waiting_type(&self, waiting_type_id: i64) -> RepoResult<Option<WaitingType>>;

    /// Sorted by `sort_order`, then id
    async fn list_waiting_types(
        &self,
        venue_id: i64,
        active_only: bool,
    ) -> RepoResult<Vec<WaitingType>>;
}
