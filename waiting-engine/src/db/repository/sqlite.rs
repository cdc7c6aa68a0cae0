//! SQLite queue store
//!
//! Number uniqueness is enforced by `UNIQUE(venue_id, day_key, waiting_number)`;
//! numbered inserts compute `MAX + 1` inside the `INSERT` itself, which runs
//! under SQLite's write lock. Updates are `UPDATE ... WHERE id = ? AND version = ?`.

use async_trait::async_trait;
use shared::models::{WaitingEntry, WaitingSetting, WaitingType};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{EntryFilter, EntryOrder, QueueStore, RepoError, RepoResult, Window};

const ENTRY_COLUMNS: &str = "id, venue_id, waiting_type_id, waiting_number, day_key, phone, phone_last_digits, name, party_size, memo, source, consent_marketing, status, created_at, called_at, called_count, call_expire_at, seated_at, cancelled_at, cancel_reason, is_deferred, customer_id, estimated_wait_minutes, version";

const SETTING_COLUMNS: &str = "venue_id, operation_status, max_waiting_count, call_timeout_minutes, max_call_count, auto_cancel, waiting_note, waiting_call_note, pause_message";

const TYPE_COLUMNS: &str = "id, venue_id, name, avg_wait_time_per_team, is_active, sort_order";

#[derive(Clone)]
pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Staff-side upsert of a venue setting (validated)
    pub async fn save_setting(&self, setting: &WaitingSetting) -> RepoResult<()> {
        setting
            .validate()
            .map_err(|(_, msg)| RepoError::Validation(msg))?;
        sqlx::query(
            "INSERT INTO waiting_setting (venue_id, operation_status, max_waiting_count, call_timeout_minutes, max_call_count, auto_cancel, waiting_note, waiting_call_note, pause_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(venue_id) DO UPDATE SET operation_status = ?2, max_waiting_count = ?3, call_timeout_minutes = ?4, max_call_count = ?5, auto_cancel = ?6, waiting_note = ?7, waiting_call_note = ?8, pause_message = ?9",
        )
        .bind(setting.venue_id)
        .bind(setting.operation_status)
        .bind(setting.max_waiting_count)
        .bind(setting.call_timeout_minutes)
        .bind(setting.max_call_count)
        .bind(setting.auto_cancel)
        .bind(&setting.waiting_note)
        .bind(&setting.waiting_call_note)
        .bind(&setting.pause_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Staff-side upsert of a waiting type
    pub async fn save_waiting_type(&self, waiting_type: &WaitingType) -> RepoResult<()> {
        if waiting_type.avg_wait_time_per_team < 0 {
            return Err(RepoError::Validation(
                "avg_wait_time_per_team cannot be negative".into(),
            ));
        }
        sqlx::query(
            "INSERT INTO waiting_type (id, venue_id, name, avg_wait_time_per_team, is_active, sort_order) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET venue_id = ?2, name = ?3, avg_wait_time_per_team = ?4, is_active = ?5, sort_order = ?6",
        )
        .bind(waiting_type.id)
        .bind(waiting_type.venue_id)
        .bind(&waiting_type.name)
        .bind(waiting_type.avg_wait_time_per_team)
        .bind(waiting_type.is_active)
        .bind(waiting_type.sort_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Appends ` WHERE ...` for every set field of the filter
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &EntryFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(venue_id) = filter.venue_id {
        qb.push(" AND venue_id = ").push_bind(venue_id);
    }
    if let Some(type_id) = filter.waiting_type_id {
        qb.push(" AND waiting_type_id = ").push_bind(type_id);
    }
    if !filter.statuses.is_empty() {
        qb.push(" AND status IN (");
        let mut sep = qb.separated(", ");
        for status in &filter.statuses {
            sep.push_bind(status.as_str());
        }
        qb.push(")");
    }
    if let Some(phone) = &filter.phone {
        qb.push(" AND phone = ").push_bind(phone.clone());
    }
    if let Some(day) = &filter.day_key {
        qb.push(" AND day_key = ").push_bind(day.clone());
    }
    if let Some(t) = filter.call_expired_at_or_before {
        qb.push(" AND call_expire_at IS NOT NULL AND call_expire_at <= ")
            .push_bind(t);
    }
    if let Some((created_at, number)) = filter.created_before {
        qb.push(" AND (created_at < ")
            .push_bind(created_at)
            .push(" OR (created_at = ")
            .push_bind(created_at)
            .push(" AND waiting_number < ")
            .push_bind(number)
            .push("))");
    }
}

fn order_clause(order: EntryOrder) -> &'static str {
    match order {
        EntryOrder::CreatedAsc => " ORDER BY created_at ASC, waiting_number ASC",
        EntryOrder::CreatedDesc => " ORDER BY created_at DESC, waiting_number DESC",
        EntryOrder::WaitingNumberDesc => " ORDER BY waiting_number DESC",
        EntryOrder::StatusThenCreated => {
            " ORDER BY CASE status WHEN 'CALLED' THEN 0 WHEN 'WAITING' THEN 1 WHEN 'SEATED' THEN 2 WHEN 'CANCELLED' THEN 3 ELSE 4 END, created_at ASC, waiting_number ASC"
        }
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn get_entry(&self, id: &str) -> RepoResult<Option<WaitingEntry>> {
        let entry = sqlx::query_as::<_, WaitingEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM waiting_entry WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn create_entry(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry> {
        sqlx::query(&format!(
            "INSERT INTO waiting_entry ({ENTRY_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&entry.id)
        .bind(entry.venue_id)
        .bind(entry.waiting_type_id)
        .bind(entry.waiting_number)
        .bind(&entry.day_key)
        .bind(&entry.phone)
        .bind(&entry.phone_last_digits)
        .bind(&entry.name)
        .bind(entry.party_size)
        .bind(&entry.memo)
        .bind(entry.source)
        .bind(entry.consent_marketing)
        .bind(entry.status)
        .bind(entry.created_at)
        .bind(entry.called_at)
        .bind(entry.called_count)
        .bind(entry.call_expire_at)
        .bind(entry.seated_at)
        .bind(entry.cancelled_at)
        .bind(entry.cancel_reason)
        .bind(entry.is_deferred)
        .bind(entry.customer_id)
        .bind(entry.estimated_wait_minutes)
        .bind(entry.version)
        .execute(&self.pool)
        .await?;
        Ok(entry.clone())
    }

    async fn create_entry_numbered(&self, entry: &WaitingEntry) -> RepoResult<WaitingEntry> {
        let waiting_number = sqlx::query_scalar::<_, i64>(&format!(
            "INSERT INTO waiting_entry ({ENTRY_COLUMNS}) VALUES (?, ?, ?, \
             (SELECT COALESCE(MAX(waiting_number), 0) + 1 FROM waiting_entry WHERE venue_id = ? AND day_key = ?), \
             ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING waiting_number"
        ))
        .bind(&entry.id)
        .bind(entry.venue_id)
        .bind(entry.waiting_type_id)
        .bind(entry.venue_id)
        .bind(&entry.day_key)
        .bind(&entry.day_key)
        .bind(&entry.phone)
        .bind(&entry.phone_last_digits)
        .bind(&entry.name)
        .bind(entry.party_size)
        .bind(&entry.memo)
        .bind(entry.source)
        .bind(entry.consent_marketing)
        .bind(entry.status)
        .bind(entry.created_at)
        .bind(entry.called_at)
        .bind(entry.called_count)
        .bind(entry.call_expire_at)
        .bind(entry.seated_at)
        .bind(entry.cancelled_at)
        .bind(entry.cancel_reason)
        .bind(entry.is_deferred)
        .bind(entry.customer_id)
        .bind(entry.estimated_wait_minutes)
        .bind(entry.version)
        .fetch_one(&self.pool)
        .await?;

        let mut numbered = entry.clone();
        numbered.waiting_number = waiting_number;
        Ok(numbered)
    }

    async fn update_entry(
        &self,
        entry: &WaitingEntry,
        expected_version: i64,
    ) -> RepoResult<WaitingEntry> {
        let result = sqlx::query(
            "UPDATE waiting_entry SET waiting_type_id = ?, phone = ?, phone_last_digits = ?, name = ?, party_size = ?, memo = ?, source = ?, consent_marketing = ?, status = ?, created_at = ?, called_at = ?, called_count = ?, call_expire_at = ?, seated_at = ?, cancelled_at = ?, cancel_reason = ?, is_deferred = ?, customer_id = ?, estimated_wait_minutes = ?, version = version + 1 \
             WHERE id = ? AND version = ?",
        )
        .bind(entry.waiting_type_id)
        .bind(&entry.phone)
        .bind(&entry.phone_last_digits)
        .bind(&entry.name)
        .bind(entry.party_size)
        .bind(&entry.memo)
        .bind(entry.source)
        .bind(entry.consent_marketing)
        .bind(entry.status)
        .bind(entry.created_at)
        .bind(entry.called_at)
        .bind(entry.called_count)
        .bind(entry.call_expire_at)
        .bind(entry.seated_at)
        .bind(entry.cancelled_at)
        .bind(entry.cancel_reason)
        .bind(entry.is_deferred)
        .bind(entry.customer_id)
        .bind(entry.estimated_wait_minutes)
        .bind(&entry.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_entry(&entry.id).await? {
                Some(current) => Err(RepoError::Conflict(format!(
                    "waiting entry {} is at version {}, expected {}",
                    entry.id, current.version, expected_version
                ))),
                None => Err(RepoError::NotFound(format!("waiting entry {}", entry.id))),
            };
        }

        self.get_entry(&entry.id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("waiting entry {}", entry.id)))
    }

    async fn count_entries(&self, filter: &EntryFilter) -> RepoResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM waiting_entry");
        push_filter(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        order: EntryOrder,
        window: Window,
    ) -> RepoResult<Vec<WaitingEntry>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ENTRY_COLUMNS} FROM waiting_entry"));
        push_filter(&mut qb, filter);
        qb.push(order_clause(order));
        // SQLite: LIMIT -1 = unbounded
        qb.push(" LIMIT ")
            .push_bind(window.limit.unwrap_or(-1))
            .push(" OFFSET ")
            .push_bind(window.offset.max(0));
        let entries = qb
            .build_query_as::<WaitingEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn max_waiting_number(&self, venue_id: i64, day_key: &str) -> RepoResult<i64> {
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(waiting_number), 0) FROM waiting_entry WHERE venue_id = ? AND day_key = ?",
        )
        .bind(venue_id)
        .bind(day_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }

    async fn get_setting(&self, venue_id: i64) -> RepoResult<Option<WaitingSetting>> {
        let setting = sqlx::query_as::<_, WaitingSetting>(&format!(
            "SELECT {SETTING_COLUMNS} FROM waiting_setting WHERE venue_id = ?"
        ))
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(setting)
    }

    async fn get_waiting_type(&self, waiting_type_id: i64) -> RepoResult<Option<WaitingType>> {
        let waiting_type = sqlx::query_as::<_, WaitingType>(&format!(
            "SELECT {TYPE_COLUMNS} FROM waiting_type WHERE id = ?"
        ))
        .bind(waiting_type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(waiting_type)
    }

    async fn list_waiting_types(
        &self,
        venue_id: i64,
        active_only: bool,
    ) -> RepoResult<Vec<WaitingType>> {
        let types = sqlx::query_as::<_, WaitingType>(&format!(
            "SELECT {TYPE_COLUMNS} FROM waiting_type WHERE venue_id = ? AND (? = 0 OR is_active = 1) ORDER BY sort_order, id"
        ))
        .bind(venue_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }
}
