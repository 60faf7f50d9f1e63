use std::sync::Arc;

use tracing::{error, info};

use crate::app_config::env::env_is_true;
use crate::sentiment::model::checkpoint::MysqlCheckpointStore;
use crate::sentiment::task::ingest_job::{DefaultIngestCycle, IngestScheduler};

/// 应用入口总编排：调度循环/心跳/信号/退出
pub async fn run() -> anyhow::Result<()> {
    // 启动抽取调度循环
    if env_is_true("IS_RUN_INGEST_JOB", true) {
        let store = MysqlCheckpointStore::new().await;
        if let Err(e) = store.create_table().await {
            error!("create ingest_checkpoint table failed: {}", e);
        }
        let scheduler = IngestScheduler::new(Arc::new(store), Arc::new(DefaultIngestCycle::new()));
        tokio::spawn(scheduler.run_forever());
        info!("ingest scheduler started");
    }

    // 心跳任务，定期输出运行状态
    let heartbeat_handle = tokio::spawn(async {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            info!("symbol_radar is running");
        }
    });

    // 捕捉退出信号
    tokio::signal::ctrl_c().await?;
    heartbeat_handle.abort();
    info!("received shutdown signal, exiting");
    Ok(())
}
