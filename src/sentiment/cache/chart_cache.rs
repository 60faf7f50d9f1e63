use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::debug;

use crate::app_config::redis as app_redis;
use crate::error::AppError;
use crate::sentiment::chart::sparkline::ChartRenderer;

/// 抽象：图表缓存提供者，key 唯一标识一条 (symbol, type) 序列
#[async_trait]
pub trait ChartCacheProvider: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
}

/// 具体实现：进程内 DashMap，LOCAL 环境与测试使用
pub struct InMemoryChartCache {
    map: DashMap<String, String>,
}

impl InMemoryChartCache {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }
}

impl Default for InMemoryChartCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChartCacheProvider for InMemoryChartCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).map(|v| v.clone())
    }

    async fn set(&self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }
}

/// 具体实现：进程内(DashMap) + Redis，不设置过期时间
///
/// 缓存条目不会被本组件失效，符号改名或历史数据订正后需要外部清理
pub struct InMemoryRedisChartCache {
    map: DashMap<String, String>,
}

impl InMemoryRedisChartCache {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }
}

impl Default for InMemoryRedisChartCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChartCacheProvider for InMemoryRedisChartCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(v) = self.map.get(key).map(|v| v.clone()) {
            return Some(v);
        }
        if let Ok(mut conn) = app_redis::get_redis_connection().await {
            if let Ok(v) = conn.get::<_, String>(key).await {
                self.map.insert(key.to_string(), v.clone());
                return Some(v);
            }
        }
        None
    }

    async fn set(&self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
        if let Ok(mut conn) = app_redis::get_redis_connection().await {
            let _: redis::RedisResult<()> = conn.set(key, value).await;
        }
    }
}

/// 图表记忆化：命中直接返回，未命中渲染后写缓存
///
/// 每个 key 一把单飞锁，两个并发请求同一未缓存 key 时只渲染一次
pub struct ChartMemoizer {
    cache: Arc<dyn ChartCacheProvider>,
    renderer: Arc<dyn ChartRenderer>,
    width: u32,
    height: u32,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ChartMemoizer {
    pub fn new(
        cache: Arc<dyn ChartCacheProvider>,
        renderer: Arc<dyn ChartRenderer>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            cache,
            renderer,
            width,
            height,
            locks: DashMap::new(),
        }
    }

    pub async fn get_or_render(&self, key: &str, series: &[i64]) -> Result<String, AppError> {
        if let Some(cached) = self.cache.get(key).await {
            debug!("chart cache hit: {}", key);
            return Ok(cached);
        }

        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // 拿到锁后再查一次，前一个持锁者可能已经渲染完成
        if let Some(cached) = self.cache.get(key).await {
            return Ok(cached);
        }

        let image = self.renderer.render(series, self.width, self.height)?;
        self.cache.set(key, &image).await;
        // 图表已落缓存，锁条目不再需要；等待者会在二次检查时直接命中
        self.locks.remove(key);
        Ok(image)
    }

    /// 在途渲染的锁条目数量
    pub fn inflight_locks(&self) -> usize {
        self.locks.len()
    }
}
