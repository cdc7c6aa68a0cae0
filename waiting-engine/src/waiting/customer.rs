//! Customer resolution hook used when seating
//!
//! The customer registry lives outside the engine. Seat only needs an id for
//! the phone; the in-memory directory below is what the sweeper binary and
//! tests use.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::util::{normalize_phone, phone_last_digits, snowflake_id};

use crate::db::RepoResult;

/// 고객 식별 길이 (전화번호 뒤 8자리)
pub const CUSTOMER_KEY_DIGITS: usize = 8;

#[async_trait]
pub trait CustomerResolver: Send + Sync {
    /// Find or create the customer for a phone, returning its id
    async fn resolve(
        &self,
        venue_id: i64,
        phone: &str,
        name: Option<&str>,
        consent_marketing: bool,
    ) -> RepoResult<i64>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: i64,
    pub venue_id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub consent_marketing: bool,
    pub visit_count: u32,
}

fn customer_key(venue_id: i64, phone: &str) -> (i64, String) {
    (
        venue_id,
        phone_last_digits(&normalize_phone(phone), CUSTOMER_KEY_DIGITS),
    )
}

/// In-memory directory keyed by `(venue_id, last 8 digits)`
#[derive(Debug, Default)]
pub struct MemoryCustomerDirectory {
    customers: DashMap<(i64, String), CustomerRecord>,
}

impl MemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, venue_id: i64, phone: &str) -> Option<CustomerRecord> {
        self.customers
            .get(&customer_key(venue_id, phone))
            .map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

#[async_trait]
impl CustomerResolver for MemoryCustomerDirectory {
    async fn resolve(
        &self,
        venue_id: i64,
        phone: &str,
        name: Option<&str>,
        consent_marketing: bool,
    ) -> RepoResult<i64> {
        let mut record = self
            .customers
            .entry(customer_key(venue_id, phone))
            .or_insert_with(|| CustomerRecord {
                id: snowflake_id(),
                venue_id,
                phone: normalize_phone(phone),
                name: None,
                consent_marketing: false,
                visit_count: 0,
            });
        record.visit_count += 1;
        if record.name.is_none() {
            record.name = name.map(str::to_string);
        }
        // consent only ever turns on here
        record.consent_marketing |= consent_marketing;
        tracing::debug!(
            venue_id,
            customer_id = record.id,
            visits = record.visit_count,
            "Customer resolved"
        );
        Ok(record.id)
    }
}
