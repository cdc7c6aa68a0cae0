//! Auto-cancel sweeper
//!
//! Periodically cancels CALLED entries whose final call has expired. Entries
//! with recalls left stay CALLED until staff act on them. Each cancel goes
//! through the normal Cancel path with an expiry guard, so a sweep racing a
//! staff recall / seat / defer loses cleanly.

use std::collections::HashMap;
use std::sync::Arc;

use shared::models::{WaitingSetting, WaitingStatus};

use super::error::{WaitingError, WaitingResult};
use super::manager::WaitingManager;
use crate::db::{EntryFilter, EntryOrder, Window};

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired calls found
    pub scanned: usize,
    pub cancelled: usize,
    /// Auto-cancel off, recalls left, or no setting
    pub skipped: usize,
    /// Lost a race, or a store error on the entry or its venue setting
    pub failed: usize,
}

pub struct AutoCancelSweeper {
    manager: Arc<WaitingManager>,
}

impl AutoCancelSweeper {
    pub fn new(manager: Arc<WaitingManager>) -> Self {
        Self { manager }
    }

    /// One pass over every venue's expired calls
    pub async fn sweep(&self) -> WaitingResult<SweepReport> {
        let now = self.manager.clock().now_millis();
        let store = self.manager.store();
        let expired = store
            .list_entries(
                &EntryFilter::default()
                    .with_statuses(&[WaitingStatus::Called])
                    .call_expired_by(now),
                EntryOrder::CreatedAsc,
                Window::ALL,
            )
            .await?;

        let mut report = SweepReport {
            scanned: expired.len(),
            ..Default::default()
        };
        let mut settings: HashMap<i64, Option<WaitingSetting>> = HashMap::new();

        for entry in expired {
            let setting = match settings.get(&entry.venue_id) {
                Some(cached) => cached.clone(),
                None => match store.get_setting(entry.venue_id).await {
                    Ok(loaded) => {
                        settings.insert(entry.venue_id, loaded.clone());
                        loaded
                    }
                    Err(e) => {
                        // not cached: the venue's next entry tries again
                        tracing::warn!(
                            venue_id = entry.venue_id,
                            entry_id = %entry.id,
                            error = %e,
                            "Auto-cancel skipped, venue setting unavailable"
                        );
                        report.failed += 1;
                        continue;
                    }
                },
            };
            let Some(setting) = setting.filter(|s| s.auto_cancel) else {
                report.skipped += 1;
                continue;
            };
            if entry.called_count < setting.max_call_count {
                tracing::debug!(
                    venue_id = entry.venue_id,
                    entry_id = %entry.id,
                    called_count = entry.called_count,
                    max_call_count = setting.max_call_count,
                    "Expired call has recalls left, leaving CALLED"
                );
                report.skipped += 1;
                continue;
            }

            match self
                .manager
                .cancel_expired_call(entry.venue_id, &entry.id)
                .await
            {
                Ok(_) => report.cancelled += 1,
                Err(e @ (WaitingError::Rejected(_) | WaitingError::NotFound { .. })) => {
                    tracing::debug!(
                        venue_id = entry.venue_id,
                        entry_id = %entry.id,
                        reason = %e,
                        "Auto-cancel skipped, entry changed since scan"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        venue_id = entry.venue_id,
                        entry_id = %entry.id,
                        error = %e,
                        "Auto-cancel failed"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.cancelled > 0 {
            tracing::info!(
                scanned = report.scanned,
                cancelled = report.cancelled,
                skipped = report.skipped,
                failed = report.failed,
                "Auto-cancel sweep finished"
            );
        } else {
            tracing::debug!(
                scanned = report.scanned,
                skipped = report.skipped,
                failed = report.failed,
                "Auto-cancel sweep finished"
            );
        }
        Ok(report)
    }
}
