use super::*;
use crate::db::{EntryOrder, RepoResult, Window};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store wrapper that interferes with `update_entry`
///
/// Each armed interference runs `before_update` against the inner store and
/// then forwards the caller's (now stale) write.
struct RacingStore {
    inner: Arc<MemoryQueueStore>,
    armed: AtomicUsize,
    interference: Interference,
}

#[derive(Clone, Copy)]
enum Interference {
    /// Rewrite the entry unchanged, bumping its version
    Touch,
    /// Cancel the entry first, as a concurrent sweep would
    Cancel,
}

impl RacingStore {
    fn new(inner: Arc<MemoryQueueStore>, interference: Interference, times: usize) -> Self {
        Self {
            inner,
            armed: AtomicUsize::new(times),
            interference,
        }
    }

    async fn interfere(&self, id: &str) {
        let armed = self
            .armed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !armed {
            return;
        }
        let Some(current) = self.inner.get_entry(id).await.unwrap() else {
            return;
        };
        let mut next = current.clone();
        if let Interference::Cancel = self.interference {
            next.status = WaitingStatus::Cancelled;
            next.cancel_reason = Some(CancelReason::AutoCancelled);
            next.cancelled_at = Some(current.created_at + 1);
        }
        self.inner.update_entry(&next, current.version).await.unwrap();
    }
}

#[async_trait]
impl QueueStore for RacingStore {
    async fn get_entry(&self, id: &str) -> RepoResult<Option<WaitingEntry>> {
        self.inner.get_entry(id).await
    }

    async fn create_entry(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry> {
        self.inner.create_entry(entry).await
    }

    async fn create_entry_numbered(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry> {
        self.inner.create_entry_numbered(entry).await
    }

    async fn update_entry(
        &self,
        entry: &WaitingEntry,
        expected_version: i64,
    ) -> RepoResult<WaitingEntry> {
        self.interfere(&entry.id).await;
        self.inner.update_entry(entry, expected_version).await
    }

    async fn count_entries(&self, filter: &EntryFilter) -> RepoResult<i64> {
        self.inner.count_entries(filter).await
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        order: EntryOrder,
        window: Window,
    ) -> RepoResult<Vec<WaitingEntry>> {
        self.inner.list_entries(filter, order, window).await
    }

    async fn max_waiting_number(&self, venue_id: i64, day_key: &str) -> RepoResult<i64> {
        self.inner.max_waiting_number(venue_id, day_key).await
    }

    async fn get_setting(&self, venue_id: i64) -> RepoResult<Option<WaitingSetting>> {
        self.inner.get_setting(venue_id).await
    }

    async fn get_waiting_type(&self, waiting_type_id: i64) -> RepoResult<Option<WaitingType>> {
        self.inner.get_waiting_type(waiting_type_id).await
    }

    async fn list_waiting_types(
        &self,
        venue_id: i64,
        active_only: bool,
    ) -> RepoResult<Vec<WaitingType>> {
        self.inner.list_waiting_types(venue_id, active_only).await
    }
}

fn racing_manager(h: &Harness, interference: Interference, times: usize) -> WaitingManager {
    let store = Arc::new(RacingStore::new(h.store.clone(), interference, times));
    WaitingManager::new(
        store,
        h.clock.clone(),
        h.notifier.clone(),
        h.customers.clone(),
    )
}

#[tokio::test]
async fn test_single_conflict_is_retried() {
    let h = harness();
    let e = h.register(walk_up("a", LANE_A)).await;
    let racing = racing_manager(&h, Interference::Touch, 1);

    let called = racing.call(VENUE, &e.id).await.unwrap();
    assert_eq!(called.status, WaitingStatus::Called);
    // original + touch + call
    assert_eq!(called.version, e.version + 2);
}

#[tokio::test]
async fn test_repeated_conflict_surfaces_as_fault() {
    let h = harness();
    let e = h.register(walk_up("a", LANE_A)).await;
    let racing = racing_manager(&h, Interference::Touch, 2);

    let err = racing.call(VENUE, &e.id).await.unwrap_err();
    assert!(err.is_fault());
    assert!(matches!(err, WaitingError::Store(RepoError::Conflict(_))));
    assert_eq!(h.reload(&e.id).await.status, WaitingStatus::Waiting);
}

#[tokio::test]
async fn test_lost_race_rejects_cleanly() {
    let h = harness();
    let e = h.register(guest("01011112222")).await;
    h.manager.call(VENUE, &e.id).await.unwrap();
    h.notifier.clear();
    let racing = racing_manager(&h, Interference::Cancel, 1);

    // staff seat races a cancel that commits first
    assert_eq!(reason_of(racing.seat(VENUE, &e.id).await), RejectReason::InvalidStatus);
    let stored = h.reload(&e.id).await;
    assert_eq!(stored.status, WaitingStatus::Cancelled);
    assert_eq!(stored.seated_at, None);
    assert_eq!(stored.customer_id, None);
    assert!(h.notifier.sent().is_empty());
    // no visit counted for a seat that never committed
    assert!(h.customers.is_empty());
}

#[tokio::test]
async fn test_memo_edit_retries_single_conflict() {
    let h = harness();
    let e = h.register(walk_up("a", LANE_A)).await;
    let racing = racing_manager(&h, Interference::Touch, 1);

    let edited = racing
        .update_memo(VENUE, &e.id, Some("high chair".into()))
        .await
        .unwrap();
    assert_eq!(edited.memo.as_deref(), Some("high chair"));
    assert_eq!(edited.version, e.version + 2);

    let racing = racing_manager(&h, Interference::Touch, 2);
    let err = racing.update_memo(VENUE, &e.id, None).await.unwrap_err();
    assert!(matches!(err, WaitingError::Store(RepoError::Conflict(_))));
    assert_eq!(h.reload(&e.id).await.memo.as_deref(), Some("high chair"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_get_unique_numbers() {
    let h = Arc::new(harness());

    let mut handles = Vec::new();
    for i in 0..40 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            let lane_id = if i % 2 == 0 { LANE_A } else { LANE_B };
            h.manager
                .register(walk_up(&format!("guest-{i}"), lane_id))
                .await
                .map(|out| out.entry.waiting_number)
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap());
    }
    numbers.sort_unstable();
    // every registration lands, numbered 1..=40 without gaps
    assert_eq!(numbers, (1..=40).collect::<Vec<i64>>());
    assert_eq!(h.store.entry_count(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transitions_on_one_entry() {
    let h = Arc::new(harness());
    let e = h.register(walk_up("a", LANE_A)).await;

    let seat = {
        let h = h.clone();
        let id = e.id.clone();
        tokio::spawn(async move { h.manager.seat(VENUE, &id).await })
    };
    let cancel = {
        let h = h.clone();
        let id = e.id.clone();
        tokio::spawn(async move {
            h.manager
                .cancel(VENUE, &id, CancelReason::StoreReason, false)
                .await
        })
    };

    let seat = seat.await.unwrap();
    let cancel = cancel.await.unwrap();
    // exactly one wins; the loser is a rejection or a surfaced conflict
    assert!(seat.is_ok() ^ cancel.is_ok());
    let stored = h.reload(&e.id).await;
    match (&seat, &cancel) {
        (Ok(s), Err(_)) => assert_eq!(stored.status, s.status),
        (Err(_), Ok(c)) => assert_eq!(stored.status, c.status),
        _ => unreachable!(),
    }
}
