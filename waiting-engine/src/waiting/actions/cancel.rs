//! Cancel: WAITING / CALLED → CANCELLED, or NO_SHOW for the no-show reason

use shared::models::{CancelReason, WaitingEntry};

use super::{ActionContext, TransitionAction};
use crate::waiting::error::{RejectReason, Rejection};
use crate::waiting::machine::Operation;

#[derive(Debug, Clone)]
pub struct CancelAction {
    pub reason: CancelReason,
    /// Send the reason-specific notification after commit
    pub notify: bool,
    /// Set by the sweeper: only cancel if the call is still expired and the
    /// recall budget is spent, as seen on the fresh read
    pub require_expired_call: bool,
}

impl CancelAction {
    pub fn new(reason: CancelReason) -> Self {
        Self {
            reason,
            notify: true,
            require_expired_call: false,
        }
    }

    pub fn silent(mut self) -> Self {
        self.notify = false;
        self
    }

    /// Auto-cancel of an expired call
    pub fn expired_call() -> Self {
        Self {
            reason: CancelReason::AutoCancelled,
            notify: true,
            require_expired_call: true,
        }
    }
}

impl TransitionAction for CancelAction {
    const OPERATION: Operation = Operation::Cancel;

    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection> {
        if self.require_expired_call {
            let expired = entry.call_expire_at.is_some_and(|t| t <= ctx.now);
            if !expired || entry.called_count < ctx.setting.max_call_count {
                return Err(Rejection::new(
                    RejectReason::CallNotExpired,
                    format!("Entry {} no longer has an expired final call", entry.label()),
                ));
            }
        }
        entry.status = self.reason.target_status();
        entry.cancelled_at = Some(ctx.now);
        entry.cancel_reason = Some(self.reason);
        entry.call_expire_at = None;
        Ok(())
    }
}
