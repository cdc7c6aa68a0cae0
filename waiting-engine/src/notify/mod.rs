//! 通知模块
//!
//! The engine derives at most one [`Notification`] per committed transition
//! ([`trigger`]) and hands it to a [`Notifier`]. Delivery (templates, SMS /
//! messenger channels) belongs to the notifier's collaborator, not the engine.

pub mod outbox;
pub mod trigger;

pub use outbox::{LoggingSink, MessageSink, OutboxNotifier, OutboxWorker};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Notification kind, independent of any downstream template system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Registered,
    Called,
    Recalled,
    CancelledByCustomer,
    /// Store reason or out of stock
    CancelledByStore,
    /// No-show or auto-cancelled after call timeout
    CancelledTimeout,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Called => "CALLED",
            Self::Recalled => "RECALLED",
            Self::CancelledByCustomer => "CANCELLED_BY_CUSTOMER",
            Self::CancelledByStore => "CANCELLED_BY_STORE",
            Self::CancelledTimeout => "CANCELLED_TIMEOUT",
        }
    }
}

/// One outbound message request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Same logical event => same key
    pub idempotency_key: String,
    pub venue_id: i64,
    pub entry_id: String,
    pub phone: String,
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Fire-and-forget enqueue of a notification
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enqueue(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Discards everything
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn enqueue(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Captures notifications in memory; can be switched to fail
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `enqueue` fail with `Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().iter().map(|n| n.kind).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("recording notifier set to fail".into()));
        }
        self.sent.lock().push(notification);
        Ok(())
    }
}
