//! Restore: undo a terminal outcome within the grace window

use shared::models::{WaitingEntry, WaitingStatus};

use super::{ActionContext, TransitionAction};
use crate::utils::time::MINUTE_MILLIS;
use crate::waiting::error::{RejectReason, Rejection};
use crate::waiting::machine::Operation;

/// 30 minutes from `seated_at` / `cancelled_at`
pub const RESTORE_WINDOW_MILLIS: i64 = 30 * MINUTE_MILLIS;

#[derive(Debug, Clone, Default)]
pub struct RestoreAction;

impl TransitionAction for RestoreAction {
    const OPERATION: Operation = Operation::Restore;

    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection> {
        // entries without a completion timestamp are restorable
        if let Some(completed_at) = entry.completed_at()
            && ctx.now - completed_at > RESTORE_WINDOW_MILLIS
        {
            return Err(Rejection::new(
                RejectReason::RestoreWindowExpired,
                "Entries completed more than 30 minutes ago cannot be restored",
            ));
        }
        entry.status = WaitingStatus::Waiting;
        entry.seated_at = None;
        entry.cancelled_at = None;
        entry.cancel_reason = None;
        entry.called_at = None;
        entry.called_count = 0;
        entry.call_expire_at = None;
        Ok(())
    }
}
