//! 时间工具 — 时钟抽象与门店时区的"今天"
//!
//! 引擎内部时间一律为 `i64` Unix millis。"今天"按门店时区计算，
//! 由 [`Clock`] 提供，测试中注入 [`FixedClock`]。

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use parking_lot::RwLock;

pub const MINUTE_MILLIS: i64 = 60_000;

/// 门店本地的一天：`[start_millis, end_millis)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDay {
    /// `YYYY-MM-DD`
    pub key: String,
    pub start_millis: i64,
    /// Exclusive
    pub end_millis: i64,
}

impl LocalDay {
    pub fn contains(&self, millis: i64) -> bool {
        millis >= self.start_millis && millis < self.end_millis
    }
}

/// Time source for the engine
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    /// The venue-local day containing `now_millis()`
    fn local_day(&self, venue_id: i64) -> LocalDay;
}

/// 日期 00:00 → Unix millis (门店时区)
///
/// DST gap fallback: 本地零点不存在时退回 UTC 零点。
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 包含 `millis` 的门店本地日
pub fn local_day_at(millis: i64, tz: Tz) -> LocalDay {
    let date = match tz.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.date_naive(),
        None => chrono::DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN),
    };
    let next = date.succ_opt().unwrap_or(date);
    LocalDay {
        key: date.format("%Y-%m-%d").to_string(),
        start_millis: day_start_millis(date, tz),
        end_millis: day_start_millis(next, tz),
    }
}

/// Wall clock with per-venue timezones
pub struct SystemClock {
    default_tz: Tz,
    venue_tz: RwLock<HashMap<i64, Tz>>,
}

impl SystemClock {
    pub fn new(default_tz: Tz) -> Self {
        Self {
            default_tz,
            venue_tz: RwLock::new(HashMap::new()),
        }
    }

    /// 为单个门店指定时区（覆盖默认时区）
    pub fn set_venue_timezone(&self, venue_id: i64, tz: Tz) {
        self.venue_tz.write().insert(venue_id, tz);
    }

    pub fn timezone_of(&self, venue_id: i64) -> Tz {
        self.venue_tz
            .read()
            .get(&venue_id)
            .copied()
            .unwrap_or(self.default_tz)
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }

    fn local_day(&self, venue_id: i64) -> LocalDay {
        local_day_at(self.now_millis(), self.timezone_of(venue_id))
    }
}

/// Manually driven clock for tests and replays
pub struct FixedClock {
    now: AtomicI64,
    tz: Tz,
}

impl FixedClock {
    pub fn new(now_millis: i64, tz: Tz) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
            tz,
        }
    }

    /// Fixed clock at a local wall-clock time, e.g. `at_local(2025, 3, 14, 12, 0, Seoul)`
    pub fn at_local(year: i32, month: u32, day: u32, hour: u32, min: u32, tz: Tz) -> Self {
        let millis = tz
            .with_ymd_and_hms(year, month, day, hour, min, 0)
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_default();
        Self::new(millis, tz)
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.now.fetch_add(minutes * MINUTE_MILLIS, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn local_day(&self, _venue_id: i64) -> LocalDay {
        local_day_at(self.now_millis(), self.tz)
    }
}
