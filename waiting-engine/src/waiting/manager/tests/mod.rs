use super::*;
use crate::db::MemoryQueueStore;
use crate::notify::{NotificationKind, RecordingNotifier};
use crate::utils::time::FixedClock;
use crate::waiting::customer::MemoryCustomerDirectory;
use shared::models::WaitingSource;

mod test_concurrency;

const VENUE: i64 = 1;
const OTHER_VENUE: i64 = 2;
/// avg 10 min / team
const LANE_A: i64 = 10;
/// avg 5 min / team
const LANE_B: i64 = 11;
/// inactive
const LANE_OFF: i64 = 12;
/// owned by OTHER_VENUE
const LANE_FOREIGN: i64 = 20;

struct Harness {
    manager: WaitingManager,
    store: Arc<MemoryQueueStore>,
    clock: Arc<FixedClock>,
    notifier: Arc<RecordingNotifier>,
    customers: Arc<MemoryCustomerDirectory>,
}

fn accepting() -> WaitingSetting {
    let mut setting = WaitingSetting::new(VENUE);
    setting.operation_status = OperationStatus::Accepting;
    setting.waiting_note = Some("Please wait near the door".into());
    setting
}

fn lane(id: i64, venue_id: i64, avg: i32, is_active: bool) -> WaitingType {
    WaitingType {
        id,
        venue_id,
        name: format!("Lane {id}"),
        avg_wait_time_per_team: avg,
        is_active,
        sort_order: id as i32,
    }
}

fn seeded_store(setting: WaitingSetting) -> Arc<MemoryQueueStore> {
    let store = Arc::new(MemoryQueueStore::new());
    store.save_setting(setting).unwrap();
    store.save_waiting_type(lane(LANE_A, VENUE, 10, true)).unwrap();
    store.save_waiting_type(lane(LANE_B, VENUE, 5, true)).unwrap();
    store.save_waiting_type(lane(LANE_OFF, VENUE, 10, false)).unwrap();
    store
        .save_waiting_type(lane(LANE_FOREIGN, OTHER_VENUE, 10, true))
        .unwrap();
    store
}

/// 2025-03-14 12:00 Asia/Seoul
fn lunch_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at_local(
        2025,
        3,
        14,
        12,
        0,
        chrono_tz::Asia::Seoul,
    ))
}

fn harness_with(setting: WaitingSetting) -> Harness {
    let store = seeded_store(setting);
    let clock = lunch_clock();
    let notifier = Arc::new(RecordingNotifier::new());
    let customers = Arc::new(MemoryCustomerDirectory::new());
    let manager = WaitingManager::new(
        store.clone(),
        clock.clone(),
        notifier.clone(),
        customers.clone(),
    );
    Harness {
        manager,
        store,
        clock,
        notifier,
        customers,
    }
}

fn harness() -> Harness {
    harness_with(accepting())
}

fn guest(phone: &str) -> WaitingRegistration {
    WaitingRegistration {
        venue_id: VENUE,
        waiting_type_id: LANE_A,
        phone: Some(phone.to_string()),
        name: None,
        party_size: 2,
        memo: None,
        source: WaitingSource::Tablet,
        consent_marketing: false,
    }
}

fn walk_up(name: &str, waiting_type_id: i64) -> WaitingRegistration {
    WaitingRegistration {
        venue_id: VENUE,
        waiting_type_id,
        phone: None,
        name: Some(name.to_string()),
        party_size: 2,
        memo: None,
        source: WaitingSource::Manual,
        consent_marketing: false,
    }
}

impl Harness {
    async fn register(&self, req: WaitingRegistration) -> WaitingEntry {
        self.manager.register(req).await.unwrap().entry
    }

    async fn reload(&self, entry_id: &str) -> WaitingEntry {
        self.store.get_entry(entry_id).await.unwrap().unwrap()
    }

    async fn queue_order(&self, waiting_type_id: i64) -> Vec<String> {
        self.store
            .list_entries(
                &EntryFilter::venue(VENUE)
                    .with_type(waiting_type_id)
                    .active(),
                crate::db::EntryOrder::CreatedAsc,
                crate::db::Window::ALL,
            )
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name.or(e.phone).unwrap_or_default())
            .collect()
    }
}

fn reason_of<T: std::fmt::Debug>(result: WaitingResult<T>) -> RejectReason {
    match result {
        Err(WaitingError::Rejected(r)) => r.reason,
        other => panic!("expected rejection, got {other:?}"),
    }
}
