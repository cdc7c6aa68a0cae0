//! 排队引擎 - walk-in waiting list
//!
//! - [`machine`] - transition table `(status, operation) → allowed`
//! - [`actions`] - one pure state change per operation
//! - [`manager`] - read / validate / version-checked write / notify
//! - [`estimator`] - position and wait-time estimates
//! - [`queries`], [`stats`] - staff list, customer lookup, counters
//! - [`sweeper`] - auto-cancel of expired final calls

pub mod actions;
pub mod customer;
pub mod error;
pub mod estimator;
pub mod machine;
pub mod manager;
pub mod queries;
pub mod stats;
pub mod sweeper;

pub use customer::{CustomerResolver, MemoryCustomerDirectory};
pub use error::{RejectReason, Rejection, Resource, WaitingError, WaitingResult};
pub use machine::Operation;
pub use manager::{DeferOutcome, RegisterOutcome, WaitingManager};
pub use sweeper::{AutoCancelSweeper, SweepReport};
