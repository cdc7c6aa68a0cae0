//! Concurrent registrations never share a waiting number

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use shared::models::{
    OperationStatus, WaitingRegistration, WaitingSetting, WaitingSource, WaitingType,
};
use waiting_engine::db::EntryFilter;
use waiting_engine::notify::NoopNotifier;
use waiting_engine::waiting::MemoryCustomerDirectory;
use waiting_engine::{DbService, FixedClock, MemoryQueueStore, QueueStore, WaitingManager};

const WRITERS: usize = 24;

fn setting() -> WaitingSetting {
    let mut setting = WaitingSetting::new(1);
    setting.operation_status = OperationStatus::Accepting;
    setting.max_waiting_count = 999;
    setting
}

fn lane(id: i64) -> WaitingType {
    WaitingType {
        id,
        venue_id: 1,
        name: format!("lane-{id}"),
        avg_wait_time_per_team: 5,
        is_active: true,
        sort_order: 0,
    }
}

fn manager_over(store: Arc<dyn QueueStore>) -> Arc<WaitingManager> {
    Arc::new(WaitingManager::new(
        store,
        Arc::new(FixedClock::at_local(2025, 3, 14, 12, 0, chrono_tz::Asia::Seoul)),
        Arc::new(NoopNotifier),
        Arc::new(MemoryCustomerDirectory::new()),
    ))
}

/// Randomly jittered writers; returns the numbers that were issued
async fn race(manager: Arc<WaitingManager>) -> Vec<i64> {
    let mut handles = Vec::with_capacity(WRITERS);
    for i in 0..WRITERS {
        let manager = manager.clone();
        let (jitter, lane_id) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..5u64), rng.gen_range(10..13i64))
        };
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(jitter)).await;
            manager
                .register(WaitingRegistration {
                    venue_id: 1,
                    waiting_type_id: lane_id,
                    phone: Some(format!("010{i:08}")),
                    name: None,
                    party_size: 2,
                    memo: None,
                    source: WaitingSource::Qr,
                    consent_marketing: false,
                })
                .await
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(out) => numbers.push(out.entry.waiting_number),
            Err(e) => panic!("registration failed under contention: {e}"),
        }
    }
    numbers
}

/// Every writer got a number, no repeats, no gaps
fn assert_all_numbered(numbers: &[i64]) {
    assert_eq!(numbers.len(), WRITERS);
    let distinct: HashSet<_> = numbers.iter().collect();
    assert_eq!(distinct.len(), numbers.len(), "duplicate numbers: {numbers:?}");
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=WRITERS as i64).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_store_concurrent_numbers() {
    let store = Arc::new(MemoryQueueStore::new());
    store.save_setting(setting()).unwrap();
    for id in 10..13 {
        store.save_waiting_type(lane(id)).unwrap();
    }
    let numbers = race(manager_over(store.clone())).await;

    assert_all_numbered(&numbers);
    assert_eq!(store.entry_count(), WRITERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_store_concurrent_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let db = DbService::new(dir.path().join("race.db").to_str().unwrap())
        .await
        .unwrap();
    let store = Arc::new(db.queue_store());
    store.save_setting(&setting()).await.unwrap();
    for id in 10..13 {
        store.save_waiting_type(&lane(id)).await.unwrap();
    }
    let numbers = race(manager_over(store.clone())).await;

    assert_all_numbered(&numbers);
    let stored = store.count_entries(&EntryFilter::venue(1)).await.unwrap();
    assert_eq!(stored as usize, WRITERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequential_numbers_are_strictly_increasing() {
    let store = Arc::new(MemoryQueueStore::new());
    store.save_setting(setting()).unwrap();
    store.save_waiting_type(lane(10)).unwrap();
    let manager = manager_over(store);

    let mut last = 0;
    for i in 0..10 {
        let out = manager
            .register(WaitingRegistration {
                venue_id: 1,
                waiting_type_id: 10,
                phone: None,
                name: Some(format!("walk-in {i}")),
                party_size: 1,
                memo: None,
                source: WaitingSource::Manual,
                consent_marketing: false,
            })
            .await
            .unwrap();
        assert!(out.entry.waiting_number > last);
        last = out.entry.waiting_number;
    }
    assert_eq!(last, 10);
}
