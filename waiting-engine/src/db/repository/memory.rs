//! In-memory queue store
//!
//! Backs tests and single-process deployments. All writes take the same
//! write lock, so number uniqueness and version checks are atomic.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::{WaitingEntry, WaitingSetting, WaitingType};
use std::collections::HashMap;

use super::{EntryFilter, EntryOrder, QueueStore, RepoError, RepoResult, Window};

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, WaitingEntry>,
    settings: HashMap<i64, WaitingSetting>,
    types: HashMap<i64, WaitingType>,
}

#[derive(Default)]
pub struct MemoryQueueStore {
    state: RwLock<MemoryState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Staff-side upsert of a venue setting (validated)
    pub fn save_setting(&self, setting: WaitingSetting) -> RepoResult<()> {
        setting
            .validate()
            .map_err(|(_, msg)| RepoError::Validation(msg))?;
        self.state.write().settings.insert(setting.venue_id, setting);
        Ok(())
    }

    /// Staff-side upsert of a waiting type
    pub fn save_waiting_type(&self, waiting_type: WaitingType) -> RepoResult<()> {
        if waiting_type.avg_wait_time_per_team < 0 {
            return Err(RepoError::Validation(
                "avg_wait_time_per_team cannot be negative".into(),
            ));
        }
        self.state
            .write()
            .types
            .insert(waiting_type.id, waiting_type);
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.state.read().entries.len()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn get_entry(&self, id: &str) -> RepoResult<Option<WaitingEntry>> {
        Ok(self.state.read().entries.get(id).cloned())
    }

    async fn create_entry(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry> {
        let mut state = self.state.write();
        if state.entries.contains_key(&entry.id) {
            return Err(RepoError::Duplicate(format!("waiting entry {}", entry.id)));
        }
        let taken = state.entries.values().any(|e| {
            e.venue_id == entry.venue_id
                && e.day_key == entry.day_key
                && e.waiting_number == entry.waiting_number
        });
        if taken {
            return Err(RepoError::Duplicate(format!(
                "waiting number {} already issued for venue {} on {}",
                entry.waiting_number, entry.venue_id, entry.day_key
            )));
        }
        state.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry.clone())
    }

    async fn create_entry_numbered(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry> {
        let mut state = self.state.write();
        if state.entries.contains_key(&entry.id) {
            return Err(RepoError::Duplicate(format!("waiting entry {}", entry.id)));
        }
        let max = state
            .entries
            .values()
            .filter(|e| e.venue_id == entry.venue_id && e.day_key == entry.day_key)
            .map(|e| e.waiting_number)
            .max()
            .unwrap_or(0);
        let mut numbered = entry.clone();
        numbered.waiting_number = max + 1;
        state.entries.insert(numbered.id.clone(), numbered.clone());
        Ok(numbered)
    }

    async fn update_entry(
        &self,
        entry: &WaitingEntry,
        expected_version: i64,
    ) -> RepoResult<WaitingEntry> {
        let mut state = self.state.write();
        let stored = state
            .entries
            .get_mut(&entry.id)
            .ok_or_else(|| RepoError::NotFound(format!("waiting entry {}", entry.id)))?;
        if stored.version != expected_version {
            return Err(RepoError::Conflict(format!(
                "waiting entry {} is at version {}, expected {}",
                entry.id, stored.version, expected_version
            )));
        }
        let mut next = entry.clone();
        // identity and numbering never change
        next.venue_id = stored.venue_id;
        next.waiting_number = stored.waiting_number;
        next.day_key = stored.day_key.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn count_entries(&self, filter: &EntryFilter) -> RepoResult<i64> {
        let state = self.state.read();
        Ok(state.entries.values().filter(|e| filter.matches(e)).count() as i64)
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        order: EntryOrder,
        window: Window,
    ) -> RepoResult<Vec<WaitingEntry>> {
        let mut list: Vec<WaitingEntry> = {
            let state = self.state.read();
            state
                .entries
                .values()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect()
        };
        list.sort_by(|a, b| order.compare(a, b));
        let offset = usize::try_from(window.offset).unwrap_or(0);
        let iter = list.into_iter().skip(offset);
        Ok(match window.limit {
            Some(n) => iter.take(usize::try_from(n).unwrap_or(0)).collect(),
            None => iter.collect(),
        })
    }

    async fn max_waiting_number(&self, venue_id: i64, day_key: &str) -> RepoResult<i64> {
        let state = self.state.read();
        Ok(state
            .entries
            .values()
            .filter(|e| e.venue_id == venue_id && e.day_key == day_key)
            .map(|e| e.waiting_number)
            .max()
            .unwrap_or(0))
    }

    async fn get_setting(&self, venue_id: i64) -> RepoResult<Option<WaitingSetting>> {
        Ok(self.state.read().settings.get(&venue_id).cloned())
    }

    async fn get_waiting_type(&self, waiting_type_id: i64) -> RepoResult<Option<WaitingType>> {
        Ok(self.state.read().types.get(&waiting_type_id).cloned())
    }

    async fn list_waiting_types(
        &self,
        venue_id: i64,
        active_only: bool,
    ) -> RepoResult<Vec<WaitingType>> {
        let mut types: Vec<WaitingType> = self
            .state
            .read()
            .types
            .values()
            .filter(|t| t.venue_id == venue_id && (!active_only || t.is_active))
            .cloned()
            .collect();
        types.sort_by_key(|t| (t.sort_order, t.id));
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{WaitingSource, WaitingStatus};

    fn entry(id: &str, number: i64) -> WaitingEntry {
        WaitingEntry {
            id: id.into(),
            venue_id: 1,
            waiting_type_id: 10,
            waiting_number: number,
            day_key: "2025-03-14".into(),
            phone: None,
            phone_last_digits: None,
            name: Some("Kim".into()),
            party_size: 2,
            memo: None,
            source: WaitingSource::Manual,
            consent_marketing: false,
            status: WaitingStatus::Waiting,
            created_at: 1_000 + number,
            called_at: None,
            called_count: 0,
            call_expire_at: None,
            seated_at: None,
            cancelled_at: None,
            cancel_reason: None,
            is_deferred: false,
            customer_id: None,
            estimated_wait_minutes: 0,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_number_same_day() {
        let store = MemoryQueueStore::new();
        store.create_entry(&entry("a", 1)).await.unwrap();

        let err = store.create_entry(&entry("b", 1)).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));

        let mut next_day = entry("c", 1);
        next_day.day_key = "2025-03-15".into();
        store.create_entry(&next_day).await.unwrap();
        assert_eq!(store.max_waiting_number(1, "2025-03-14").await.unwrap(), 1);
        assert_eq!(store.max_waiting_number(1, "2025-03-16").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_numbered_create_continues_the_day() {
        let store = MemoryQueueStore::new();
        store.create_entry(&entry("a", 4)).await.unwrap();

        let b = store.create_entry_numbered(&entry("b", 0)).await.unwrap();
        assert_eq!(b.waiting_number, 5);
        assert_eq!(store.get_entry("b").await.unwrap().unwrap().waiting_number, 5);

        let mut next_day = entry("c", 99);
        next_day.day_key = "2025-03-15".into();
        let c = store.create_entry_numbered(&next_day).await.unwrap();
        assert_eq!(c.waiting_number, 1);

        let dup = store.create_entry_numbered(&entry("a", 0)).await;
        assert!(matches!(dup, Err(RepoError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_is_compare_and_set() {
        let store = MemoryQueueStore::new();
        let created = store.create_entry(&entry("a", 1)).await.unwrap();

        let mut called = created.clone();
        called.status = WaitingStatus::Called;
        let saved = store.update_entry(&called, 0).await.unwrap();
        assert_eq!(saved.version, 1);

        // stale writer
        let mut stale = created;
        stale.status = WaitingStatus::Cancelled;
        let err = store.update_entry(&stale, 0).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        let stored = store.get_entry("a").await.unwrap().unwrap();
        assert_eq!(stored.status, WaitingStatus::Called);
    }

    #[tokio::test]
    async fn test_update_missing_entry_is_not_found() {
        let store = MemoryQueueStore::new();
        let err = store.update_entry(&entry("x", 1), 0).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_window_and_order() {
        let store = MemoryQueueStore::new();
        for n in 1..=5 {
            store
                .create_entry(&entry(&format!("e{n}"), n))
                .await
                .unwrap();
        }
        let page = store
            .list_entries(
                &EntryFilter::venue(1),
                EntryOrder::WaitingNumberDesc,
                Window { limit: Some(2), offset: 1 },
            )
            .await
            .unwrap();
        let numbers: Vec<i64> = page.iter().map(|e| e.waiting_number).collect();
        assert_eq!(numbers, vec![4, 3]);
    }

    #[test]
    fn test_save_setting_validates() {
        let store = MemoryQueueStore::new();
        let mut setting = WaitingSetting::new(1);
        setting.max_call_count = 0;
        assert!(matches!(
            store.save_setting(setting),
            Err(RepoError::Validation(_))
        ));
    }
}
