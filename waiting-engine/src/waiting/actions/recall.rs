//! Recall: CALLED → CALLED with one more call, within the venue's budget

use shared::models::WaitingEntry;

use super::{ActionContext, TransitionAction};
use crate::waiting::error::{RejectReason, Rejection};
use crate::waiting::machine::Operation;

#[derive(Debug, Clone, Default)]
pub struct RecallAction;

impl TransitionAction for RecallAction {
    const OPERATION: Operation = Operation::Recall;

    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection> {
        let max = ctx.setting.max_call_count;
        if entry.called_count >= max {
            return Err(Rejection::new(
                RejectReason::RecallLimitExceeded,
                format!("Maximum call count ({max}) reached"),
            ));
        }
        entry.called_count += 1;
        entry.call_expire_at = Some(ctx.now + ctx.setting.call_timeout_millis());
        Ok(())
    }
}
