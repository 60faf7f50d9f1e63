use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::app_config::env::env_i64;
use crate::error::AppError;
use crate::sentiment::model::checkpoint::CheckpointStore;
use crate::sentiment::model::symbol_daily::SymbolDailyModel;
use crate::sentiment::services::extract_service::ExtractService;
use crate::time_util;

/// 默认抽取周期：12 小时
pub const DEFAULT_PERIOD_MS: i64 = 12 * 60 * 60 * 1000;

/// 调度器状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Waiting,
    Running,
}

/// 抽象：一次抽取周期。调度器只依赖这个接口，测试注入假实现
#[async_trait]
pub trait IngestCycle: Send + Sync {
    async fn run(&self, day_ts: i64) -> Result<usize, AppError>;
}

/// 具体实现：抽取当天聚合并替换落库（先清当天旧行再插入，保证幂等）
pub struct DefaultIngestCycle {
    extract: ExtractService,
}

impl DefaultIngestCycle {
    pub fn new() -> Self {
        Self {
            extract: ExtractService::new(),
        }
    }
}

impl Default for DefaultIngestCycle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IngestCycle for DefaultIngestCycle {
    async fn run(&self, day_ts: i64) -> Result<usize, AppError> {
        let day = time_util::midnight_ms(day_ts);
        let aggregates = self.extract.build_daily_aggregates(day).await?;

        let model = SymbolDailyModel::new().await;
        model.delete_day(day).await?;
        let entities: Vec<_> = aggregates.iter().map(|a| a.to_entity()).collect();
        model
            .add_list(&entities)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        info!("ingest cycle done: {} aggregates for day {}", aggregates.len(), day);
        Ok(aggregates.len())
    }
}

/// 抽取调度器：持久化 checkpoint 驱动的定时循环
///
/// offset = period - (now - last_ingested_at)：
/// - offset <= 0 到期或超期，先落 checkpoint 再执行抽取，之后整周期后再查
/// - offset > 0 继续等待，offset 后再查
///
/// checkpoint 在执行前落库：进程中途崩溃不会造成重复抽取风暴，
/// 代价是抽取未完成时这一轮可能被跳过。
pub struct IngestScheduler {
    store: Arc<dyn CheckpointStore>,
    cycle: Arc<dyn IngestCycle>,
    period_ms: i64,
    state: SchedulerState,
    last_ingested_at: i64,
}

impl IngestScheduler {
    const MAX_RETRY_ATTEMPTS: u32 = 3;
    const RETRY_DELAY_MS: u64 = 500;

    pub fn new(store: Arc<dyn CheckpointStore>, cycle: Arc<dyn IngestCycle>) -> Self {
        let period_ms = env_i64("INGEST_PERIOD_SECS", DEFAULT_PERIOD_MS / 1000) * 1000;
        Self::with_period(store, cycle, period_ms)
    }

    pub fn with_period(
        store: Arc<dyn CheckpointStore>,
        cycle: Arc<dyn IngestCycle>,
        period_ms: i64,
    ) -> Self {
        Self {
            store,
            cycle,
            period_ms,
            state: SchedulerState::Waiting,
            last_ingested_at: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_ingested_at(&self) -> i64 {
        self.last_ingested_at
    }

    /// 距下次到期的毫秒数，<= 0 表示已到期
    pub fn offset_ms(&self, now_ms: i64) -> i64 {
        self.period_ms - (now_ms - self.last_ingested_at)
    }

    /// 启动时加载 checkpoint；不存在时视作"刚跑过"，避免首次启动立即爆发
    pub async fn init(&mut self, now_ms: i64) -> Result<(), AppError> {
        self.last_ingested_at = match self.store.load().await? {
            Some(ts) => ts,
            None => {
                self.store.save(now_ms).await?;
                now_ms
            }
        };
        info!(
            "ingest scheduler init: last_ingested_at = {}",
            time_util::mill_time_to_datetime(self.last_ingested_at).unwrap_or_default()
        );
        Ok(())
    }

    /// 执行一次检查，返回下次检查前应等待的毫秒数
    pub async fn step(&mut self, now_ms: i64) -> Result<i64, AppError> {
        let offset = self.offset_ms(now_ms);
        if offset > 0 {
            self.state = SchedulerState::Waiting;
            return Ok(offset);
        }

        self.state = SchedulerState::Running;
        // checkpoint 必须先于抽取落库
        self.last_ingested_at = now_ms;
        self.store.save(now_ms).await?;

        self.run_cycle_with_retry(now_ms).await;

        self.state = SchedulerState::Waiting;
        Ok(self.period_ms)
    }

    /// 有界重试，重试耗尽只记日志，不影响下一轮调度
    async fn run_cycle_with_retry(&self, now_ms: i64) {
        let day = time_util::midnight_ms(now_ms);
        for attempt in 1..=Self::MAX_RETRY_ATTEMPTS {
            match self.cycle.run(day).await {
                Ok(count) => {
                    info!("ingest cycle ok: {} aggregates (attempt {})", count, attempt);
                    return;
                }
                Err(e) if attempt < Self::MAX_RETRY_ATTEMPTS => {
                    warn!("ingest cycle failed, retry {}: {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(
                        Self::RETRY_DELAY_MS * attempt as u64,
                    ))
                    .await;
                }
                Err(e) => {
                    let err = AppError::Schedule(format!(
                        "ingest cycle exhausted {} attempts: {}",
                        Self::MAX_RETRY_ATTEMPTS,
                        e
                    ));
                    error!("{}", err);
                }
            }
        }
    }

    /// 进程生命周期的调度循环，没有终止状态
    pub async fn run_forever(mut self) {
        let now = Utc::now().timestamp_millis();
        if let Err(e) = self.init(now).await {
            error!("ingest scheduler init failed: {}", e);
            return;
        }

        loop {
            let now = Utc::now().timestamp_millis();
            let sleep_ms = match self.step(now).await {
                Ok(ms) => ms,
                Err(e) => {
                    // checkpoint 落库失败：记日志，整周期后重试
                    error!("ingest scheduler step failed: {}", e);
                    self.period_ms
                }
            };
            tokio::time::sleep(Duration::from_millis(sleep_ms.max(0) as u64)).await;
        }
    }
}

/// 手动触发一次抽取周期，幂等，CLI 与调度器共用
pub async fn run_ingestion_cycle(day_ts: Option<i64>) -> Result<usize, AppError> {
    let day = day_ts.unwrap_or_else(|| Utc::now().timestamp_millis());
    DefaultIngestCycle::new().run(day).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::model::checkpoint::MemoryCheckpointStore;

    struct NoopCycle;

    #[async_trait]
    impl IngestCycle for NoopCycle {
        async fn run(&self, _day_ts: i64) -> Result<usize, AppError> {
            Ok(0)
        }
    }

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[tokio::test]
    async fn test_offset_overdue_and_waiting() -> anyhow::Result<()> {
        let now = 1_700_000_000_000;

        // 13 小时前跑过，12 小时周期 -> 已超期
        let store = Arc::new(MemoryCheckpointStore::with_value(now - 13 * HOUR_MS));
        let mut scheduler =
            IngestScheduler::with_period(store, Arc::new(NoopCycle), DEFAULT_PERIOD_MS);
        scheduler.init(now).await?;
        assert!(scheduler.offset_ms(now) <= 0);

        // 1 小时前跑过 -> 还要等 11 小时
        let store = Arc::new(MemoryCheckpointStore::with_value(now - HOUR_MS));
        let mut scheduler =
            IngestScheduler::with_period(store, Arc::new(NoopCycle), DEFAULT_PERIOD_MS);
        scheduler.init(now).await?;
        assert_eq!(scheduler.offset_ms(now), 11 * HOUR_MS);
        Ok(())
    }
}
