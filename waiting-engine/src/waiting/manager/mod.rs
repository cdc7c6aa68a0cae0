//! WaitingManager - queue state machine entry point
//!
//! Every operation is a read-validate-write against the [`QueueStore`]:
//!
//! ```text
//! operation(venue_id, entry_id)
//!     ├─ 1. Read entry (venue-scoped) + venue setting
//!     ├─ 2. Transition table check + action rules (actions::run)
//!     ├─ 3. Version-checked write (one retry on conflict, from step 1)
//!     ├─ 4. Notification (best effort, after commit)
//!     └─ 5. Return updated entry
//! ```
//!
//! Registration leaves numbering to [`QueueStore::create_entry_numbered`],
//! which takes the day's `max + 1` and inserts in one atomic step.

use std::sync::Arc;

use shared::models::{
    CancelReason, OperationStatus, WaitingEntry, WaitingRegistration, WaitingSetting,
    WaitingStatus, WaitingType,
};
use shared::util::{normalize_phone, phone_last_digits};

use super::actions::{
    self, ActionContext, CallAction, CancelAction, DeferAction, RecallAction, RestoreAction,
    SeatAction, TransitionAction,
};
use super::customer::CustomerResolver;
use super::error::{RejectReason, Resource, WaitingError, WaitingResult};
use super::estimator;
use super::machine::Operation;
use crate::db::{EntryFilter, QueueStore, RepoError};
use crate::notify::{Notification, Notifier, trigger};
use crate::utils::time::Clock;

/// Re-reads after a version conflict on a transition
pub const CONFLICT_RETRIES: usize = 1;

/// Digits of the phone kept for display
const PHONE_DISPLAY_DIGITS: usize = 4;

/// Result of a successful registration
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub entry: WaitingEntry,
    /// 1-based position in the type's queue
    pub position: i64,
    pub estimated_wait_minutes: i64,
}

/// Result of a successful defer
#[derive(Debug, Clone)]
pub struct DeferOutcome {
    pub entry: WaitingEntry,
    pub position: i64,
}

pub struct WaitingManager {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    customers: Arc<dyn CustomerResolver>,
}

impl std::fmt::Debug for WaitingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingManager")
            .field("store", &"<QueueStore>")
            .field("clock", &"<Clock>")
            .field("notifier", &"<Notifier>")
            .finish()
    }
}

impl WaitingManager {
    pub fn new(
        store: Arc<dyn QueueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        customers: Arc<dyn CustomerResolver>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            customers,
        }
    }

    pub fn store(&self) -> &dyn QueueStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ========== Register ==========

    /// Put a party in the queue
    pub async fn register(&self, req: WaitingRegistration) -> WaitingResult<RegisterOutcome> {
        let venue_id = req.venue_id;
        let phone = req
            .phone
            .as_deref()
            .map(normalize_phone)
            .filter(|p| !p.is_empty());
        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        if req.party_size < 1 {
            return Err(reject(
                venue_id,
                RejectReason::InvalidPartySize,
                "Party size must be at least 1",
            ));
        }
        if phone.is_none() && name.is_none() {
            return Err(reject(
                venue_id,
                RejectReason::MissingContact,
                "A phone number or a name is required",
            ));
        }

        let setting = self.store.get_setting(venue_id).await?;
        check_accepting(venue_id, setting.as_ref())?;
        let setting = setting.unwrap_or_else(|| WaitingSetting::new(venue_id));

        let queued_in_venue = self
            .store
            .count_entries(&EntryFilter::venue(venue_id).active())
            .await?;
        if queued_in_venue >= i64::from(setting.max_waiting_count) {
            return Err(reject(
                venue_id,
                RejectReason::CapacityExceeded,
                format!(
                    "Waiting list is full ({} teams)",
                    setting.max_waiting_count
                ),
            ));
        }

        let waiting_type = self.active_type(venue_id, req.waiting_type_id).await?;

        let day = self.clock.local_day(venue_id);
        if let Some(phone) = &phone {
            let existing = self
                .store
                .count_entries(
                    &EntryFilter::venue(venue_id)
                        .active()
                        .with_phone(phone.clone())
                        .on_day(day.key.clone()),
                )
                .await?;
            if existing > 0 {
                return Err(reject(
                    venue_id,
                    RejectReason::DuplicatePhone,
                    "This phone number is already waiting today",
                ));
            }
        }

        let ahead = estimator::active_in_type(self.store(), venue_id, waiting_type.id).await?;
        let estimated_wait_minutes = estimator::minutes_for(ahead, &waiting_type);
        let position = ahead + 1;

        let now = self.clock.now_millis();
        let entry = WaitingEntry {
            id: uuid::Uuid::new_v4().to_string(),
            venue_id,
            waiting_type_id: waiting_type.id,
            waiting_number: 0,
            day_key: day.key.clone(),
            phone_last_digits: phone
                .as_deref()
                .map(|p| phone_last_digits(p, PHONE_DISPLAY_DIGITS)),
            phone,
            name,
            party_size: req.party_size,
            memo: req.memo.filter(|m| !m.trim().is_empty()),
            source: req.source,
            consent_marketing: req.consent_marketing,
            status: WaitingStatus::Waiting,
            created_at: now,
            called_at: None,
            called_count: 0,
            call_expire_at: None,
            seated_at: None,
            cancelled_at: None,
            cancel_reason: None,
            is_deferred: false,
            customer_id: None,
            estimated_wait_minutes,
            version: 0,
        };

        let saved = self.store.create_entry_numbered(&entry).await?;

        tracing::info!(
            venue_id,
            entry_id = %saved.id,
            waiting_number = saved.waiting_number,
            waiting_type_id = saved.waiting_type_id,
            position,
            estimated_wait_minutes,
            "Waiting registered"
        );

        self.notify_best_effort(trigger::registered(&saved, position, &setting))
            .await;

        Ok(RegisterOutcome {
            entry: saved,
            position,
            estimated_wait_minutes,
        })
    }

    async fn active_type(&self, venue_id: i64, waiting_type_id: i64) -> WaitingResult<WaitingType> {
        let waiting_type = self
            .store
            .get_waiting_type(waiting_type_id)
            .await?
            .filter(|t| t.venue_id == venue_id)
            .ok_or_else(|| WaitingError::NotFound {
                resource: Resource::WaitingType,
                id: waiting_type_id.to_string(),
            })?;
        if !waiting_type.is_active {
            return Err(reject(
                venue_id,
                RejectReason::WaitingTypeInactive,
                format!("Waiting type '{}' is not accepting", waiting_type.name),
            ));
        }
        Ok(waiting_type)
    }

    // ========== Transitions ==========

    /// WAITING → CALLED
    pub async fn call(&self, venue_id: i64, entry_id: &str) -> WaitingResult<WaitingEntry> {
        let (entry, setting) = self.transition(venue_id, entry_id, &CallAction).await?;
        self.notify_best_effort(trigger::called(&entry, &setting))
            .await;
        Ok(entry)
    }

    /// Call again within the venue's call budget
    pub async fn recall(&self, venue_id: i64, entry_id: &str) -> WaitingResult<WaitingEntry> {
        let (entry, setting) = self.transition(venue_id, entry_id, &RecallAction).await?;
        self.notify_best_effort(trigger::recalled(&entry, &setting))
            .await;
        Ok(entry)
    }

    /// Seat the party, then link a customer record when the entry has a phone
    ///
    /// The customer is resolved only after the seat has committed, so a seat
    /// that loses a race never counts a visit.
    pub async fn seat(&self, venue_id: i64, entry_id: &str) -> WaitingResult<WaitingEntry> {
        let (seated, _) = self.transition(venue_id, entry_id, &SeatAction).await?;
        let phone = match (&seated.phone, seated.customer_id) {
            (Some(phone), None) => phone.clone(),
            _ => return Ok(seated),
        };
        let Some(customer_id) = self.resolve_customer(&seated, &phone).await else {
            return Ok(seated);
        };

        let linked = self
            .edit_entry(venue_id, entry_id, "link_customer", |entry| {
                if entry.customer_id.is_none() {
                    entry.customer_id = Some(customer_id);
                }
                Ok(())
            })
            .await;
        match linked {
            Ok(entry) => Ok(entry),
            Err(e) => {
                tracing::warn!(
                    venue_id,
                    entry_id,
                    customer_id,
                    error = %e,
                    "Seated, but customer link was not saved"
                );
                Ok(seated)
            }
        }
    }

    async fn resolve_customer(&self, entry: &WaitingEntry, phone: &str) -> Option<i64> {
        match self
            .customers
            .resolve(
                entry.venue_id,
                phone,
                entry.name.as_deref(),
                entry.consent_marketing,
            )
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(
                    venue_id = entry.venue_id,
                    entry_id = %entry.id,
                    error = %e,
                    "Customer resolution failed, seating without customer link"
                );
                None
            }
        }
    }

    /// WAITING / CALLED → CANCELLED (or NO_SHOW)
    pub async fn cancel(
        &self,
        venue_id: i64,
        entry_id: &str,
        reason: CancelReason,
        notify: bool,
    ) -> WaitingResult<WaitingEntry> {
        let mut action = CancelAction::new(reason);
        if !notify {
            action = action.silent();
        }
        self.cancel_with(venue_id, entry_id, &action).await
    }

    /// Sweeper path: cancel only if the final call is still expired on a fresh read
    pub(crate) async fn cancel_expired_call(
        &self,
        venue_id: i64,
        entry_id: &str,
    ) -> WaitingResult<WaitingEntry> {
        self.cancel_with(venue_id, entry_id, &CancelAction::expired_call())
            .await
    }

    async fn cancel_with(
        &self,
        venue_id: i64,
        entry_id: &str,
        action: &CancelAction,
    ) -> WaitingResult<WaitingEntry> {
        let (entry, setting) = self.transition(venue_id, entry_id, action).await?;
        if action.notify {
            self.notify_best_effort(trigger::cancelled(&entry, Some(&setting)))
                .await;
        }
        Ok(entry)
    }

    /// Back of the type's queue
    pub async fn defer(&self, venue_id: i64, entry_id: &str) -> WaitingResult<DeferOutcome> {
        let (entry, _) = self.transition(venue_id, entry_id, &DeferAction).await?;
        let position = estimator::position_of(self.store(), &entry)
            .await?
            .unwrap_or(1);
        Ok(DeferOutcome { entry, position })
    }

    /// Undo SEATED / CANCELLED / NO_SHOW within the grace window
    pub async fn restore(&self, venue_id: i64, entry_id: &str) -> WaitingResult<WaitingEntry> {
        let (entry, _) = self.transition(venue_id, entry_id, &RestoreAction).await?;
        Ok(entry)
    }

    /// Staff note on an entry, in any status; blank clears it
    pub async fn update_memo(
        &self,
        venue_id: i64,
        entry_id: &str,
        memo: Option<String>,
    ) -> WaitingResult<WaitingEntry> {
        let memo = memo
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        self.edit_entry(venue_id, entry_id, "update_memo", |entry| {
            entry.memo = memo.clone();
            Ok(())
        })
        .await
    }

    /// Version-checked field edit outside the transition table, re-reading
    /// once on a conflict
    async fn edit_entry<F>(
        &self,
        venue_id: i64,
        entry_id: &str,
        change: &'static str,
        edit: F,
    ) -> WaitingResult<WaitingEntry>
    where
        F: Fn(&mut WaitingEntry) -> WaitingResult<()> + Send + Sync,
    {
        let mut conflicts = 0;
        loop {
            let current = self.load_entry(venue_id, entry_id).await?;
            let mut next = current.clone();
            edit(&mut next)?;
            match self.store.update_entry(&next, current.version).await {
                Ok(saved) => {
                    tracing::info!(venue_id, entry_id, change, "Waiting entry updated");
                    return Ok(saved);
                }
                Err(RepoError::Conflict(msg)) if conflicts < CONFLICT_RETRIES => {
                    conflicts += 1;
                    tracing::debug!(
                        venue_id,
                        entry_id,
                        change,
                        reason = %msg,
                        "Version conflict, re-reading entry"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read, validate and write one transition, re-reading once on a version conflict
    async fn transition<A: TransitionAction>(
        &self,
        venue_id: i64,
        entry_id: &str,
        action: &A,
    ) -> WaitingResult<(WaitingEntry, WaitingSetting)> {
        let operation = A::OPERATION;
        let mut conflicts = 0;
        loop {
            let current = self.load_entry(venue_id, entry_id).await?;
            let setting = self
                .store
                .get_setting(venue_id)
                .await?
                .unwrap_or_else(|| WaitingSetting::new(venue_id));
            let ctx = ActionContext {
                now: self.clock.now_millis(),
                setting: &setting,
            };

            let next = actions::run(action, &current, &ctx).map_err(|r| {
                log_rejection(venue_id, entry_id, operation, &r.message);
                WaitingError::Rejected(r)
            })?;

            match self.store.update_entry(&next, current.version).await {
                Ok(saved) => {
                    tracing::info!(
                        venue_id,
                        entry_id,
                        waiting_number = saved.waiting_number,
                        operation = %operation,
                        from = %current.status,
                        to = %saved.status,
                        "Waiting transition applied"
                    );
                    return Ok((saved, setting));
                }
                Err(RepoError::Conflict(msg)) if conflicts < CONFLICT_RETRIES => {
                    conflicts += 1;
                    tracing::debug!(
                        venue_id,
                        entry_id,
                        operation = %operation,
                        reason = %msg,
                        "Version conflict, re-reading entry"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Entry by id, scoped to the venue
    pub(crate) async fn load_entry(&self, venue_id: i64, entry_id: &str) -> WaitingResult<WaitingEntry> {
        self.store
            .get_entry(entry_id)
            .await?
            .filter(|e| e.venue_id == venue_id)
            .ok_or_else(|| WaitingError::entry_not_found(entry_id))
    }

    async fn notify_best_effort(&self, notification: Option<Notification>) {
        let Some(notification) = notification else {
            return;
        };
        let kind = notification.kind;
        let entry_id = notification.entry_id.clone();
        if let Err(e) = self.notifier.enqueue(notification).await {
            tracing::warn!(
                entry_id = %entry_id,
                kind = kind.as_str(),
                error = %e,
                "Notification enqueue failed"
            );
        }
    }
}

fn check_accepting(venue_id: i64, setting: Option<&WaitingSetting>) -> WaitingResult<()> {
    let status = setting.map_or(OperationStatus::Closed, |s| s.operation_status);
    match status {
        OperationStatus::Accepting => Ok(()),
        OperationStatus::Closed => Err(reject(
            venue_id,
            RejectReason::VenueClosed,
            "Waiting is closed",
        )),
        OperationStatus::Paused => Err(reject(
            venue_id,
            RejectReason::VenuePaused,
            setting
                .and_then(|s| s.pause_message.clone())
                .unwrap_or_else(|| "Waiting is paused".to_string()),
        )),
        OperationStatus::WalkIn => Err(reject(
            venue_id,
            RejectReason::VenueWalkIn,
            "Tables are available, please come in",
        )),
    }
}

fn reject(venue_id: i64, reason: RejectReason, message: impl Into<String>) -> WaitingError {
    let message = message.into();
    tracing::debug!(venue_id, reason = ?reason, detail = %message, "Registration rejected");
    WaitingError::rejected(reason, message)
}

fn log_rejection(venue_id: i64, entry_id: &str, operation: Operation, detail: &str) {
    tracing::debug!(venue_id, entry_id, operation = %operation, detail, "Transition rejected");
}

#[cfg(test)]
mod tests;
