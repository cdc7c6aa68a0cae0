//! Wait-time estimation and queue position
//!
//! Minutes = teams ahead × the type's average service time per team. Types
//! are parallel lanes, so a venue-wide figure is the longest lane, never the
//! sum.

use shared::models::{WaitingEntry, WaitingType};

use crate::db::{EntryFilter, QueueStore, RepoResult};

/// Minutes for `teams_ahead` teams in `waiting_type`
pub fn minutes_for(teams_ahead: i64, waiting_type: &WaitingType) -> i64 {
    teams_ahead.max(0) * i64::from(waiting_type.avg_wait_time_per_team.max(0))
}

/// WAITING + CALLED entries in a venue's type
pub async fn active_in_type(
    store: &dyn QueueStore,
    venue_id: i64,
    waiting_type_id: i64,
) -> RepoResult<i64> {
    store
        .count_entries(&EntryFilter::venue(venue_id).with_type(waiting_type_id).active())
        .await
}

/// Estimate for a new arrival in the type; 0 for an unknown, foreign or inactive type
pub async fn estimate(
    store: &dyn QueueStore,
    venue_id: i64,
    waiting_type_id: i64,
) -> RepoResult<i64> {
    let Some(waiting_type) = store.get_waiting_type(waiting_type_id).await? else {
        return Ok(0);
    };
    if !waiting_type.is_active || waiting_type.venue_id != venue_id {
        return Ok(0);
    }
    let queued = active_in_type(store, venue_id, waiting_type_id).await?;
    Ok(minutes_for(queued, &waiting_type))
}

/// 1-based rank of an active entry within its type; `None` once terminal
pub async fn position_of(store: &dyn QueueStore, entry: &WaitingEntry) -> RepoResult<Option<i64>> {
    if !entry.status.is_active() {
        return Ok(None);
    }
    let ahead = store
        .count_entries(
            &EntryFilter::venue(entry.venue_id)
                .with_type(entry.waiting_type_id)
                .active()
                .ahead_of(entry),
        )
        .await?;
    Ok(Some(ahead + 1))
}

/// Live estimate for an entry: teams ahead × avg; 0 once terminal
pub async fn live_estimate(
    store: &dyn QueueStore,
    entry: &WaitingEntry,
    waiting_type: Option<&WaitingType>,
) -> RepoResult<i64> {
    let (Some(position), Some(waiting_type)) = (position_of(store, entry).await?, waiting_type)
    else {
        return Ok(0);
    };
    Ok(minutes_for(position - 1, waiting_type))
}

/// Venue-wide estimate: longest lane among lanes with a queue
pub fn venue_estimate(per_type: impl IntoIterator<Item = (i64, i64)>) -> i64 {
    per_type
        .into_iter()
        .filter(|(teams, _)| *teams > 0)
        .map(|(_, minutes)| minutes)
        .max()
        .unwrap_or(0)
}
