//! Read paths: staff list, customer status lookup, customer self-cancel

use shared::models::{
    CancelReason, WaitingEntry, WaitingListItem, WaitingListPage, WaitingListQuery,
    WaitingStatusView,
};
use shared::util::normalize_phone;

use super::error::{WaitingError, WaitingResult};
use super::estimator;
use super::manager::WaitingManager;
use crate::db::{EntryFilter, EntryOrder, Window};

/// Upper bound for a staff list page
pub const MAX_PAGE_SIZE: u32 = 200;

impl WaitingManager {
    /// Staff list: CALLED first, then WAITING, then terminal, each in queue order
    pub async fn list_entries(
        &self,
        venue_id: i64,
        query: WaitingListQuery,
    ) -> WaitingResult<WaitingListPage> {
        let day_key = query
            .day_key
            .unwrap_or_else(|| self.clock().local_day(venue_id).key);
        let mut filter = EntryFilter::venue(venue_id)
            .with_statuses(&query.statuses)
            .on_day(day_key);
        if let Some(type_id) = query.waiting_type_id {
            filter = filter.with_type(type_id);
        }

        let page = query.page.max(1);
        let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

        let total = self.store().count_entries(&filter).await?;
        let entries = self
            .store()
            .list_entries(
                &filter,
                EntryOrder::StatusThenCreated,
                Window::page(page, page_size),
            )
            .await?;

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let position = estimator::position_of(self.store(), &entry).await?;
            items.push(WaitingListItem { entry, position });
        }

        Ok(WaitingListPage {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Customer view of one entry
    pub async fn status_of(&self, venue_id: i64, entry_id: &str) -> WaitingResult<WaitingStatusView> {
        let entry = self.load_entry(venue_id, entry_id).await?;
        self.status_view(entry).await
    }

    /// Latest entry registered today with this phone
    pub async fn find_status_by_phone(
        &self,
        venue_id: i64,
        phone: &str,
    ) -> WaitingResult<WaitingStatusView> {
        let entry = self.latest_today_by_phone(venue_id, phone, false).await?;
        self.status_view(entry).await
    }

    /// Customer cancel of their latest active entry today
    pub async fn cancel_by_phone(&self, venue_id: i64, phone: &str) -> WaitingResult<WaitingEntry> {
        let entry = self.latest_today_by_phone(venue_id, phone, true).await?;
        self.cancel(venue_id, &entry.id, CancelReason::CustomerRequest, true)
            .await
    }

    /// Customer cancel by entry id (link in the registration message)
    pub async fn cancel_by_customer(
        &self,
        venue_id: i64,
        entry_id: &str,
    ) -> WaitingResult<WaitingEntry> {
        self.cancel(venue_id, entry_id, CancelReason::CustomerRequest, true)
            .await
    }

    async fn latest_today_by_phone(
        &self,
        venue_id: i64,
        phone: &str,
        active_only: bool,
    ) -> WaitingResult<WaitingEntry> {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return Err(WaitingError::entry_not_found(phone));
        }
        let today = self.clock().local_day(venue_id);
        let mut filter = EntryFilter::venue(venue_id)
            .with_phone(phone.clone())
            .on_day(today.key);
        if active_only {
            filter = filter.active();
        }
        self.store()
            .list_entries(&filter, EntryOrder::CreatedDesc, Window::first(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WaitingError::entry_not_found(phone))
    }

    async fn status_view(&self, entry: WaitingEntry) -> WaitingResult<WaitingStatusView> {
        let waiting_type = self.store().get_waiting_type(entry.waiting_type_id).await?;
        let position = estimator::position_of(self.store(), &entry).await?;
        let estimated_wait_minutes = match (position, &waiting_type) {
            (Some(_), Some(_)) => {
                estimator::live_estimate(self.store(), &entry, waiting_type.as_ref()).await?
            }
            _ => entry.estimated_wait_minutes,
        };

        Ok(WaitingStatusView {
            id: entry.id,
            waiting_number: entry.waiting_number,
            status: entry.status,
            waiting_type_id: entry.waiting_type_id,
            waiting_type_name: waiting_type.map(|t| t.name),
            party_size: entry.party_size,
            position,
            estimated_wait_minutes,
            called_at: entry.called_at,
            call_expire_at: entry.call_expire_at,
            created_at: entry.created_at,
        })
    }
}
