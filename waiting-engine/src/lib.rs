//! Waiting Engine - 门店排队队列引擎
//!
//! # 模块结构
//!
//! ```text
//! waiting-engine/src/
//! ├── core/          # 配置、后台任务
//! ├── db/            # SQLite 连接池、QueueStore (memory / sqlite)
//! ├── notify/        # 通知类型、触发规则、发件箱
//! ├── utils/         # 日志、时钟
//! └── waiting/       # 状态机、估算、管理器、统计、自动取消
//! ```

pub mod core;
pub mod db;
pub mod notify;
pub mod utils;
pub mod waiting;

// Re-export 公共类型
pub use crate::core::{BackgroundTasks, Config, TaskKind};
pub use db::{DbService, MemoryQueueStore, QueueStore, RepoError, SqliteQueueStore};
pub use notify::{Notification, NotificationKind, Notifier, OutboxNotifier};
pub use utils::{Clock, FixedClock, SystemClock};
pub use waiting::{AutoCancelSweeper, WaitingError, WaitingManager, WaitingResult};

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 加载 .env 并初始化日志
pub fn setup_environment() -> Config {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    config
}
