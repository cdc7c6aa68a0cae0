//! Transition action implementations
//!
//! Each action is a pure state change on a freshly read entry. The manager
//! supplies the read, the write (version-checked) and the notification; an
//! action only validates and mutates.

use shared::models::{WaitingEntry, WaitingSetting};

use super::error::Rejection;
use super::machine::{self, Operation};

mod call;
mod cancel;
mod defer;
mod recall;
mod restore;
mod seat;

pub use call::CallAction;
pub use cancel::CancelAction;
pub use defer::DeferAction;
pub use recall::RecallAction;
pub use restore::{RESTORE_WINDOW_MILLIS, RestoreAction};
pub use seat::SeatAction;

/// Inputs shared by every action
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub now: i64,
    /// Venue setting, or defaults when the venue has none
    pub setting: &'a WaitingSetting,
}

pub trait TransitionAction {
    const OPERATION: Operation;

    /// Mutate `entry` into its next state; status already checked
    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection>;
}

/// Table check, then the action's own rules
pub fn run<A: TransitionAction>(
    action: &A,
    entry: &WaitingEntry,
    ctx: &ActionContext<'_>,
) -> Result<WaitingEntry, Rejection> {
    machine::check(entry.status, A::OPERATION)?;
    let mut next = entry.clone();
    action.apply(&mut next, ctx)?;
    if let Some(expected) = machine::target(A::OPERATION) {
        debug_assert_eq!(next.status, expected, "{} produced wrong status", A::OPERATION);
    }
    Ok(next)
}
