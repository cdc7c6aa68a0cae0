//! Defer: back of the type's queue, without leaving it

use shared::models::{WaitingEntry, WaitingStatus};

use super::{ActionContext, TransitionAction};
use crate::waiting::error::Rejection;
use crate::waiting::machine::Operation;

#[derive(Debug, Clone, Default)]
pub struct DeferAction;

impl TransitionAction for DeferAction {
    const OPERATION: Operation = Operation::Defer;

    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection> {
        entry.status = WaitingStatus::Waiting;
        entry.called_at = None;
        entry.called_count = 0;
        entry.call_expire_at = None;
        entry.is_deferred = true;
        // queue order is by created_at; day_key and number stay
        entry.created_at = ctx.now;
        Ok(())
    }
}
