//! Seat: WAITING / CALLED → SEATED

use shared::models::{WaitingEntry, WaitingStatus};

use super::{ActionContext, TransitionAction};
use crate::waiting::error::Rejection;
use crate::waiting::machine::Operation;

#[derive(Debug, Clone, Default)]
pub struct SeatAction;

impl TransitionAction for SeatAction {
    const OPERATION: Operation = Operation::Seat;

    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection> {
        entry.status = WaitingStatus::Seated;
        entry.seated_at = Some(ctx.now);
        entry.call_expire_at = None;
        Ok(())
    }
}
