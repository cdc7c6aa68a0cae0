//! Outbox notifier
//!
//! [`OutboxNotifier`] dedupes idempotency keys and queues notifications on a
//! bounded channel; [`OutboxWorker`] drains the channel and hands each message
//! to a [`MessageSink`], retrying with backoff. The engine never waits for
//! delivery.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Notification, Notifier, NotifyError};

const MAX_DELIVERY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 200;
/// Keys older than this are forgotten once the table grows past `PRUNE_THRESHOLD`
const KEY_RETENTION_MILLIS: i64 = 24 * 60 * 60 * 1000;
const PRUNE_THRESHOLD: usize = 10_000;

/// Delivery collaborator (message templates, SMS / messenger gateway)
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sink that only logs; used when no gateway is configured
pub struct LoggingSink;

#[async_trait]
impl MessageSink for LoggingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = notification.kind.as_str(),
            venue_id = notification.venue_id,
            entry_id = %notification.entry_id,
            key = %notification.idempotency_key,
            "Notification dispatched"
        );
        Ok(())
    }
}

pub struct OutboxNotifier {
    /// idempotency key → first seen (millis)
    seen: DashMap<String, i64>,
    tx: mpsc::Sender<Notification>,
}

impl OutboxNotifier {
    /// Notifier plus the receiving end for an [`OutboxWorker`]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                seen: DashMap::new(),
                tx,
            },
            rx,
        )
    }

    pub fn tracked_keys(&self) -> usize {
        self.seen.len()
    }

    fn prune(&self, now: i64) {
        if self.seen.len() > PRUNE_THRESHOLD {
            self.seen.retain(|_, at| now - *at < KEY_RETENTION_MILLIS);
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        let now = shared::util::now_millis();
        let key = notification.idempotency_key.clone();
        if self.seen.insert(key.clone(), now).is_some() {
            tracing::debug!(key = %key, "Duplicate notification suppressed");
            return Ok(());
        }
        self.prune(now);

        if let Err(e) = self.tx.try_send(notification) {
            // not queued: allow a later retry of the same event
            self.seen.remove(&key);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => {
                    NotifyError::Unavailable("outbox full".into())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    NotifyError::Unavailable("outbox closed".into())
                }
            });
        }
        Ok(())
    }
}

/// Background dispatcher, registered as a `TaskKind::Worker`
pub struct OutboxWorker {
    rx: mpsc::Receiver<Notification>,
    sink: Arc<dyn MessageSink>,
}

impl OutboxWorker {
    pub fn new(rx: mpsc::Receiver<Notification>, sink: Arc<dyn MessageSink>) -> Self {
        Self { rx, sink }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Outbox worker started");
        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(notification) => self.deliver(notification).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    // flush what is already queued
                    while let Ok(notification) = self.rx.try_recv() {
                        self.deliver(notification).await;
                    }
                    break;
                }
            }
        }
        tracing::info!("Outbox worker stopped");
    }

    async fn deliver(&self, notification: Notification) {
        for attempt in 1..=MAX_DELIVERY_ATTEMPTS {
            match self.sink.deliver(&notification).await {
                Ok(()) => return,
                Err(e) if attempt < MAX_DELIVERY_ATTEMPTS => {
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1);
                    tracing::warn!(
                        key = %notification.idempotency_key,
                        attempt,
                        error = %e,
                        "Notification delivery failed, retrying in {}ms",
                        delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => {
                    tracing::error!(
                        key = %notification.idempotency_key,
                        entry_id = %notification.entry_id,
                        error = %e,
                        "Notification dropped after {} attempts",
                        MAX_DELIVERY_ATTEMPTS
                    );
                }
            }
        }
    }
}
