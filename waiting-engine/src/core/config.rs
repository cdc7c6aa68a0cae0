use chrono_tz::Tz;

/// 排队引擎配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/waiting | 工作目录 |
/// | DATABASE_PATH | `<WORK_DIR>/waiting.db` | SQLite 文件 |
/// | VENUE_TIMEZONE | Asia/Seoul | 门店默认时区 (IANA) |
/// | SWEEP_INTERVAL_SECS | 30 | 自动取消扫描间隔(秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/waiting SWEEP_INTERVAL_SECS=10 cargo run --bin waiting-sweeper
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// SQLite 数据库路径
    pub database_path: String,
    /// 门店默认时区，用于计算"今天"
    pub venue_timezone: Tz,
    /// 自动取消扫描间隔 (秒)
    pub sweep_interval_secs: u64,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置或无法解析的变量使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/waiting".into());
        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| format!("{}/waiting.db", work_dir.trim_end_matches('/')));
        let venue_timezone = match std::env::var("VENUE_TIMEZONE") {
            Ok(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(timezone = %name, "Unknown VENUE_TIMEZONE, falling back to Asia/Seoul");
                DEFAULT_TIMEZONE
            }),
            Err(_) => DEFAULT_TIMEZONE,
        };

        Self {
            work_dir,
            database_path,
            venue_timezone,
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(30),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 覆盖工作目录与数据库路径
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, sweep_interval_secs: u64) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = format!("{}/waiting.db", config.work_dir.trim_end_matches('/'));
        config.sweep_interval_secs = sweep_interval_secs;
        config
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
