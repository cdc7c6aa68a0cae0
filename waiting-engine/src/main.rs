use std::sync::Arc;

use waiting_engine::notify::{LoggingSink, OutboxWorker};
use waiting_engine::waiting::MemoryCustomerDirectory;
use waiting_engine::{
    AutoCancelSweeper, BackgroundTasks, DbService, OutboxNotifier, SystemClock, TaskKind,
    WaitingManager, setup_environment,
};

/// Outbox channel capacity
const OUTBOX_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv, 配置, 日志)
    let config = setup_environment();
    tracing::info!(
        environment = %config.environment,
        database = %config.database_path,
        timezone = %config.venue_timezone,
        interval_secs = config.sweep_interval_secs,
        "Waiting sweeper starting"
    );

    // 2. 数据库
    std::fs::create_dir_all(&config.work_dir)?;
    let db = DbService::new(&config.database_path).await?;

    // 3. 引擎
    let (notifier, outbox_rx) = OutboxNotifier::channel(OUTBOX_CAPACITY);
    let manager = Arc::new(WaitingManager::new(
        Arc::new(db.queue_store()),
        Arc::new(SystemClock::new(config.venue_timezone)),
        Arc::new(notifier),
        Arc::new(MemoryCustomerDirectory::new()),
    ));

    // 4. 后台任务
    let mut tasks = BackgroundTasks::new();
    let worker = OutboxWorker::new(outbox_rx, Arc::new(LoggingSink));
    let shutdown = tasks.shutdown_token();
    tasks.spawn("notification_outbox", TaskKind::Worker, worker.run(shutdown));

    let sweeper = Arc::new(AutoCancelSweeper::new(manager));
    tasks.spawn_periodic("auto_cancel_sweeper", config.sweep_interval(), move || {
        let sweeper = sweeper.clone();
        async move {
            if let Err(e) = sweeper.sweep().await {
                tracing::error!(error = %e, "Auto-cancel sweep failed");
            }
        }
    });
    tasks.log_summary();

    // 5. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;
    db.pool.close().await;

    Ok(())
}
