use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use symbol_radar::error::AppError;
use symbol_radar::sentiment::model::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use symbol_radar::sentiment::task::ingest_job::{
    IngestCycle, IngestScheduler, SchedulerState, DEFAULT_PERIOD_MS,
};

const HOUR_MS: i64 = 60 * 60 * 1000;
const NOW: i64 = 1_700_000_000_000;

/// 统计执行次数的假抽取周期，可在执行时检查 checkpoint 内容
struct CountingCycle {
    runs: AtomicUsize,
    store: Option<Arc<MemoryCheckpointStore>>,
    fail_first: AtomicUsize,
}

impl CountingCycle {
    fn new() -> Self {
        Self {
            runs: AtomicUsize::new(0),
            store: None,
            fail_first: AtomicUsize::new(0),
        }
    }

    fn watching(store: Arc<MemoryCheckpointStore>) -> Self {
        Self {
            runs: AtomicUsize::new(0),
            store: Some(store),
            fail_first: AtomicUsize::new(0),
        }
    }

    fn failing(times: usize) -> Self {
        Self {
            runs: AtomicUsize::new(0),
            store: None,
            fail_first: AtomicUsize::new(times),
        }
    }
}

#[async_trait]
impl IngestCycle for CountingCycle {
    async fn run(&self, _day_ts: i64) -> Result<usize, AppError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(store) = &self.store {
            // checkpoint 必须在抽取执行前已经落库
            let saved = store.load().await?;
            assert_eq!(saved, Some(NOW));
        }
        if self.fail_first.load(Ordering::SeqCst) >= self.runs.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("simulated failure".to_string()));
        }
        Ok(1)
    }
}

#[tokio::test]
async fn test_overdue_checkpoint_triggers_immediate_run() -> anyhow::Result<()> {
    // 13 小时前跑过，12 小时周期 -> 本轮立即执行
    let store = Arc::new(MemoryCheckpointStore::with_value(NOW - 13 * HOUR_MS));
    let cycle = Arc::new(CountingCycle::watching(store.clone()));
    let mut scheduler =
        IngestScheduler::with_period(store.clone(), cycle.clone(), DEFAULT_PERIOD_MS);

    scheduler.init(NOW).await?;
    let sleep_ms = scheduler.step(NOW).await?;

    assert_eq!(cycle.runs.load(Ordering::SeqCst), 1);
    assert_eq!(sleep_ms, DEFAULT_PERIOD_MS);
    assert_eq!(store.load().await?, Some(NOW));
    assert_eq!(scheduler.state(), SchedulerState::Waiting);
    Ok(())
}

#[tokio::test]
async fn test_recent_checkpoint_waits_for_offset() -> anyhow::Result<()> {
    // 1 小时前跑过 -> 11 小时后再查，本轮不执行
    let store = Arc::new(MemoryCheckpointStore::with_value(NOW - HOUR_MS));
    let cycle = Arc::new(CountingCycle::new());
    let mut scheduler =
        IngestScheduler::with_period(store.clone(), cycle.clone(), DEFAULT_PERIOD_MS);

    scheduler.init(NOW).await?;
    let sleep_ms = scheduler.step(NOW).await?;

    assert_eq!(cycle.runs.load(Ordering::SeqCst), 0);
    assert_eq!(sleep_ms, 11 * HOUR_MS);
    // checkpoint 未被改写
    assert_eq!(store.load().await?, Some(NOW - HOUR_MS));
    Ok(())
}

#[tokio::test]
async fn test_missing_checkpoint_defaults_to_now() -> anyhow::Result<()> {
    // 首次启动视作"刚跑过"，不立即爆发
    let store = Arc::new(MemoryCheckpointStore::new());
    let cycle = Arc::new(CountingCycle::new());
    let mut scheduler =
        IngestScheduler::with_period(store.clone(), cycle.clone(), DEFAULT_PERIOD_MS);

    scheduler.init(NOW).await?;
    assert_eq!(store.load().await?, Some(NOW));

    let sleep_ms = scheduler.step(NOW).await?;
    assert_eq!(cycle.runs.load(Ordering::SeqCst), 0);
    assert_eq!(sleep_ms, DEFAULT_PERIOD_MS);
    Ok(())
}

#[tokio::test]
async fn test_transient_failure_is_retried() -> anyhow::Result<()> {
    let store = Arc::new(MemoryCheckpointStore::with_value(NOW - 13 * HOUR_MS));
    let cycle = Arc::new(CountingCycle::failing(1));
    let mut scheduler =
        IngestScheduler::with_period(store.clone(), cycle.clone(), DEFAULT_PERIOD_MS);

    scheduler.init(NOW).await?;
    scheduler.step(NOW).await?;

    // 第一次失败后重试成功
    assert_eq!(cycle.runs.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_retries_do_not_stall_schedule() -> anyhow::Result<()> {
    let store = Arc::new(MemoryCheckpointStore::with_value(NOW - 13 * HOUR_MS));
    let cycle = Arc::new(CountingCycle::failing(100));
    let mut scheduler =
        IngestScheduler::with_period(store.clone(), cycle.clone(), DEFAULT_PERIOD_MS);

    scheduler.init(NOW).await?;
    // 重试耗尽只记日志，step 仍然返回整周期
    let sleep_ms = scheduler.step(NOW).await?;
    assert_eq!(sleep_ms, DEFAULT_PERIOD_MS);
    assert_eq!(cycle.runs.load(Ordering::SeqCst), 3);

    // checkpoint 已前移，下一轮按周期等待
    assert_eq!(store.load().await?, Some(NOW));
    Ok(())
}
