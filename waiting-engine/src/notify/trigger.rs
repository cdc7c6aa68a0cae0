//! Transition → notification mapping
//!
//! Each function returns `None` when the entry has no phone. Keys are
//! deterministic: replaying the same committed state yields the same key,
//! while a later call / recall / cancel of the same entry yields a new one.

use shared::models::{CancelGroup, CancelReason, WaitingEntry, WaitingSetting};
use std::collections::BTreeMap;

use super::{Notification, NotificationKind};

pub fn kind_for_cancel(reason: CancelReason) -> NotificationKind {
    match reason.group() {
        CancelGroup::Customer => NotificationKind::CancelledByCustomer,
        CancelGroup::Store => NotificationKind::CancelledByStore,
        CancelGroup::Timeout => NotificationKind::CancelledTimeout,
    }
}

fn build(
    kind: NotificationKind,
    key: String,
    entry: &WaitingEntry,
    variables: BTreeMap<String, String>,
) -> Option<Notification> {
    let phone = entry.phone.as_ref().filter(|p| !p.is_empty())?;
    Some(Notification {
        kind,
        idempotency_key: key,
        venue_id: entry.venue_id,
        entry_id: entry.id.clone(),
        phone: phone.clone(),
        variables,
    })
}

fn base_vars(entry: &WaitingEntry) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("waiting_number".into(), entry.waiting_number.to_string());
    if let Some(name) = &entry.name {
        vars.insert("name".into(), name.clone());
    }
    vars
}

/// Sent once per entry
pub fn registered(
    entry: &WaitingEntry,
    position: i64,
    setting: &WaitingSetting,
) -> Option<Notification> {
    let mut vars = base_vars(entry);
    vars.insert("position".into(), position.to_string());
    vars.insert("party_size".into(), entry.party_size.to_string());
    vars.insert(
        "estimated_wait_minutes".into(),
        entry.estimated_wait_minutes.to_string(),
    );
    vars.insert(
        "waiting_note".into(),
        setting.waiting_note.clone().unwrap_or_default(),
    );
    build(
        NotificationKind::Registered,
        format!("waiting_registered:{}", entry.id),
        entry,
        vars,
    )
}

/// Keyed by `called_at`: a deferred entry called again gets a new message
pub fn called(entry: &WaitingEntry, setting: &WaitingSetting) -> Option<Notification> {
    let called_at = entry.called_at?;
    let mut vars = base_vars(entry);
    vars.insert(
        "timeout_minutes".into(),
        setting.call_timeout_minutes.to_string(),
    );
    vars.insert(
        "call_note".into(),
        setting.waiting_call_note.clone().unwrap_or_default(),
    );
    build(
        NotificationKind::Called,
        format!("waiting_called:{}:{}", entry.id, called_at),
        entry,
        vars,
    )
}

/// Keyed by the call cycle (`called_at`) and `called_count`: defer and
/// restore reset the count, the next call starts a new cycle
pub fn recalled(entry: &WaitingEntry, setting: &WaitingSetting) -> Option<Notification> {
    let called_at = entry.called_at?;
    let mut vars = base_vars(entry);
    vars.insert("called_count".into(), entry.called_count.to_string());
    vars.insert(
        "timeout_minutes".into(),
        setting.call_timeout_minutes.to_string(),
    );
    build(
        NotificationKind::Recalled,
        format!(
            "waiting_recalled:{}:{}:{}",
            entry.id, called_at, entry.called_count
        ),
        entry,
        vars,
    )
}

/// Keyed by `cancelled_at`; template variant chosen by reason group
pub fn cancelled(entry: &WaitingEntry, setting: Option<&WaitingSetting>) -> Option<Notification> {
    let reason = entry.cancel_reason?;
    let cancelled_at = entry.cancelled_at?;
    let kind = kind_for_cancel(reason);
    let mut vars = base_vars(entry);
    if kind == NotificationKind::CancelledTimeout
        && let Some(setting) = setting
    {
        vars.insert(
            "timeout_minutes".into(),
            setting.call_timeout_minutes.to_string(),
        );
    }
    build(
        kind,
        format!("waiting_cancelled:{}:{}", entry.id, cancelled_at),
        entry,
        vars,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{WaitingSource, WaitingStatus};

    fn entry(phone: Option<&str>) -> WaitingEntry {
        WaitingEntry {
            id: "w-1".into(),
            venue_id: 3,
            waiting_type_id: 10,
            waiting_number: 7,
            day_key: "2025-03-14".into(),
            phone: phone.map(String::from),
            phone_last_digits: None,
            name: Some("Lee".into()),
            party_size: 4,
            memo: None,
            source: WaitingSource::Qr,
            consent_marketing: false,
            status: WaitingStatus::Waiting,
            created_at: 1_000,
            called_at: None,
            called_count: 0,
            call_expire_at: None,
            seated_at: None,
            cancelled_at: None,
            cancel_reason: None,
            is_deferred: false,
            customer_id: None,
            estimated_wait_minutes: 20,
            version: 0,
        }
    }

    #[test]
    fn test_no_phone_no_notification() {
        let setting = WaitingSetting::new(3);
        assert!(registered(&entry(None), 1, &setting).is_none());
        assert!(registered(&entry(Some("")), 1, &setting).is_none());
    }

    #[test]
    fn test_registered_carries_number_position_and_note() {
        let mut setting = WaitingSetting::new(3);
        setting.waiting_note = Some("Please wait near the door".into());
        let n = registered(&entry(Some("01012345678")), 3, &setting).unwrap();
        assert_eq!(n.kind, NotificationKind::Registered);
        assert_eq!(n.idempotency_key, "waiting_registered:w-1");
        assert_eq!(n.variables["waiting_number"], "7");
        assert_eq!(n.variables["position"], "3");
        assert_eq!(n.variables["party_size"], "4");
        assert_eq!(n.variables["waiting_note"], "Please wait near the door");
    }

    #[test]
    fn test_called_and_recalled_keys_change_per_event() {
        let setting = WaitingSetting::new(3);
        let mut e = entry(Some("01012345678"));
        e.status = WaitingStatus::Called;
        e.called_at = Some(5_000);
        e.called_count = 1;
        let first = called(&e, &setting).unwrap();
        assert_eq!(first.idempotency_key, "waiting_called:w-1:5000");
        assert_eq!(first.variables["timeout_minutes"], "3");

        e.called_count = 2;
        let recall = recalled(&e, &setting).unwrap();
        assert_eq!(recall.idempotency_key, "waiting_recalled:w-1:5000:2");

        // same state, same key
        assert_eq!(recalled(&e, &setting).unwrap().idempotency_key, recall.idempotency_key);

        // count reset by defer, called again later: new cycle, new key
        e.called_at = Some(65_000);
        assert_eq!(
            recalled(&e, &setting).unwrap().idempotency_key,
            "waiting_recalled:w-1:65000:2"
        );

        e.called_at = None;
        assert!(recalled(&e, &setting).is_none());
    }

    #[test]
    fn test_cancel_variants_by_reason_group() {
        let setting = WaitingSetting::new(3);
        let mut e = entry(Some("01012345678"));
        e.status = WaitingStatus::Cancelled;
        e.cancelled_at = Some(9_000);

        e.cancel_reason = Some(CancelReason::CustomerRequest);
        assert_eq!(
            cancelled(&e, Some(&setting)).unwrap().kind,
            NotificationKind::CancelledByCustomer
        );

        e.cancel_reason = Some(CancelReason::OutOfStock);
        assert_eq!(
            cancelled(&e, Some(&setting)).unwrap().kind,
            NotificationKind::CancelledByStore
        );

        e.cancel_reason = Some(CancelReason::AutoCancelled);
        let n = cancelled(&e, Some(&setting)).unwrap();
        assert_eq!(n.kind, NotificationKind::CancelledTimeout);
        assert_eq!(n.idempotency_key, "waiting_cancelled:w-1:9000");
        assert_eq!(n.variables["timeout_minutes"], "3");
    }
}
