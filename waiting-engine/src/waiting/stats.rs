//! Daily counters and live queue snapshot

use shared::models::{LiveQueueStats, TodayStats, TypeQueueStats, WaitingStatus};

use super::error::WaitingResult;
use super::estimator;
use super::manager::WaitingManager;
use crate::db::{EntryFilter, EntryOrder, Window};
use crate::utils::time::MINUTE_MILLIS;

impl WaitingManager {
    /// Counters over entries whose local day is today
    ///
    /// Keyed by `day_key`, fixed at registration: a deferred entry is still
    /// counted once, on the day it registered.
    pub async fn today_stats(&self, venue_id: i64) -> WaitingResult<TodayStats> {
        let day = self.clock().local_day(venue_id);
        let base = EntryFilter::venue(venue_id).on_day(day.key.clone());

        let count = |status: WaitingStatus| {
            let filter = base.clone().with_statuses(&[status]);
            async move { self.store().count_entries(&filter).await }
        };

        let waiting = count(WaitingStatus::Waiting).await?;
        let called = count(WaitingStatus::Called).await?;
        let seated = count(WaitingStatus::Seated).await?;
        let cancelled = count(WaitingStatus::Cancelled).await?;
        let no_show = count(WaitingStatus::NoShow).await?;

        let seated_entries = self
            .store()
            .list_entries(
                &base.clone().with_statuses(&[WaitingStatus::Seated]),
                EntryOrder::CreatedAsc,
                Window::ALL,
            )
            .await?;
        let waits: Vec<i64> = seated_entries
            .iter()
            .filter_map(|e| e.seated_at.map(|s| (s - e.created_at).max(0)))
            .collect();

        Ok(TodayStats {
            day_key: day.key,
            total: waiting + called + seated + cancelled + no_show,
            waiting,
            called,
            seated,
            cancelled,
            no_show,
            avg_wait_minutes: average_minutes(&waits),
        })
    }

    /// Per active lane: teams, party size and estimate; venue totals sum the
    /// lanes and take the longest estimate
    pub async fn live_queue_stats(&self, venue_id: i64) -> WaitingResult<LiveQueueStats> {
        let lanes = self.store().list_waiting_types(venue_id, true).await?;

        let mut types = Vec::with_capacity(lanes.len());
        for lane in lanes {
            let queued = self
                .store()
                .list_entries(
                    &EntryFilter::venue(venue_id).with_type(lane.id).active(),
                    EntryOrder::CreatedAsc,
                    Window::ALL,
                )
                .await?;
            let teams = queued.len() as i64;
            types.push(TypeQueueStats {
                waiting_type_id: lane.id,
                estimated_minutes: estimator::minutes_for(teams, &lane),
                name: lane.name,
                teams,
                party_size_total: queued.iter().map(|e| i64::from(e.party_size)).sum(),
            });
        }

        Ok(LiveQueueStats {
            total_teams: types.iter().map(|t| t.teams).sum(),
            total_party_size: types.iter().map(|t| t.party_size_total).sum(),
            estimated_minutes: estimator::venue_estimate(
                types.iter().map(|t| (t.teams, t.estimated_minutes)),
            ),
            types,
        })
    }
}

/// Mean of millisecond durations, in rounded minutes; 0 when empty
fn average_minutes(durations: &[i64]) -> i64 {
    if durations.is_empty() {
        return 0;
    }
    let mean = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
    (mean / MINUTE_MILLIS as f64).round() as i64
}
