//! Transition table
//!
//! `(current status, operation)` → allowed or not. Every action checks the
//! table before touching the entry; nothing else in the engine inspects
//! status to decide whether an operation may run.

use shared::models::WaitingStatus;
use std::fmt;

use super::error::{RejectReason, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Call,
    Recall,
    Seat,
    Cancel,
    Defer,
    Restore,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Call,
        Operation::Recall,
        Operation::Seat,
        Operation::Cancel,
        Operation::Defer,
        Operation::Restore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Call => "call",
            Operation::Recall => "recall",
            Operation::Seat => "seat",
            Operation::Cancel => "cancel",
            Operation::Defer => "defer",
            Operation::Restore => "restore",
        }
    }

    /// Statuses the operation may start from
    pub fn sources(self) -> &'static [WaitingStatus] {
        use WaitingStatus::*;
        match self {
            Operation::Call => &[Waiting],
            Operation::Recall => &[Called],
            Operation::Seat | Operation::Cancel | Operation::Defer => &[Waiting, Called],
            Operation::Restore => &[Seated, Cancelled, NoShow],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn allows(from: WaitingStatus, op: Operation) -> bool {
    op.sources().contains(&from)
}

/// Status after `op`; Cancel's outcome depends on the reason, so it is
/// resolved by the cancel action itself
pub fn target(op: Operation) -> Option<WaitingStatus> {
    match op {
        Operation::Call | Operation::Recall => Some(WaitingStatus::Called),
        Operation::Seat => Some(WaitingStatus::Seated),
        Operation::Defer | Operation::Restore => Some(WaitingStatus::Waiting),
        Operation::Cancel => None,
    }
}

pub fn check(from: WaitingStatus, op: Operation) -> Result<(), Rejection> {
    if allows(from, op) {
        return Ok(());
    }
    let expected: Vec<&str> = op.sources().iter().map(|s| s.as_str()).collect();
    Err(Rejection::new(
        RejectReason::InvalidStatus,
        format!(
            "Cannot {op} an entry that is {from}; expected {}",
            expected.join(" or ")
        ),
    ))
}
