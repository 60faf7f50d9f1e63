use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppError;
use crate::sentiment::model::symbol_daily::{DailySymbolAggregate, SymbolKey, SymbolType};
use crate::sentiment::model::thread_stat::{ThreadSnapshot, ThreadStatModel};
use crate::sentiment::tag::resolver::{DictTagResolver, TagResolver};
use crate::time_util;

/// 日度抽取服务：把一天的帖子快照折叠成每个 (symbol, type) 的日聚合
pub struct ExtractService {
    resolver: Arc<dyn TagResolver>,
}

impl ExtractService {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(DictTagResolver::new()),
        }
    }

    pub fn with_resolver(resolver: Arc<dyn TagResolver>) -> Self {
        Self { resolver }
    }

    /// 抽取某一天的日聚合，day_ts 会先对齐到零点
    ///
    /// 只读，不落库；持久化由调用方负责
    pub async fn build_daily_aggregates(
        &self,
        day_ts: i64,
    ) -> Result<Vec<DailySymbolAggregate>, AppError> {
        let day = time_util::midnight_ms(day_ts);
        let model = ThreadStatModel::new().await;
        let snapshots = model
            .list_range_with_title(day, time_util::next_day_ms(day))
            .await?;
        info!("daily extract: {} snapshots for day {}", snapshots.len(), day);
        self.fold_snapshots(day, &snapshots).await
    }

    /// 核心折叠逻辑：
    /// - 每个帖子 id 只处理一次（同一帖子的重复快照行被跳过，标题也只解析一次）
    /// - 每个符号候选 upsert 到 (symbol, type) 聚合：帖子/动词并集，点赞/评论累加
    /// - 标题先做 `&amp;` -> `&` 解码
    pub async fn fold_snapshots(
        &self,
        day_ts: i64,
        snapshots: &[ThreadSnapshot],
    ) -> Result<Vec<DailySymbolAggregate>, AppError> {
        let mut seen_threads: HashSet<&str> = HashSet::new();
        let mut stock_map: HashMap<SymbolKey, DailySymbolAggregate> = HashMap::new();
        let mut crypto_map: HashMap<SymbolKey, DailySymbolAggregate> = HashMap::new();
        let mut other_map: HashMap<SymbolKey, DailySymbolAggregate> = HashMap::new();

        for snapshot in snapshots {
            if !seen_threads.insert(snapshot.id.as_str()) {
                continue;
            }

            let title = snapshot.title.replace("&amp;", "&");
            let tags = self.resolver.resolve(&title).await?;
            debug!("thread {} resolved {:?}", snapshot.id, tags);

            upsert_symbols(
                &mut stock_map,
                &tags.stock_symbols,
                SymbolType::Stock,
                day_ts,
                snapshot,
                &tags.verbs,
            );
            upsert_symbols(
                &mut crypto_map,
                &tags.crypto_symbols,
                SymbolType::Crypto,
                day_ts,
                snapshot,
                &tags.verbs,
            );
            upsert_symbols(
                &mut other_map,
                &tags.other_symbols,
                SymbolType::Other,
                day_ts,
                snapshot,
                &tags.verbs,
            );
        }

        // 三类 map 拍平成一个序列
        let mut result: Vec<DailySymbolAggregate> = Vec::new();
        result.extend(stock_map.into_values());
        result.extend(crypto_map.into_values());
        result.extend(other_map.into_values());
        result.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(result)
    }
}

impl Default for ExtractService {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert_symbols(
    map: &mut HashMap<SymbolKey, DailySymbolAggregate>,
    symbols: &[String],
    symbol_type: SymbolType,
    day_ts: i64,
    snapshot: &ThreadSnapshot,
    verbs: &[String],
) {
    for symbol in symbols {
        let key = SymbolKey::new(symbol.clone(), symbol_type);
        let agg = map
            .entry(key)
            .or_insert_with(|| DailySymbolAggregate::new(symbol.clone(), symbol_type, day_ts));
        agg.threads.insert(snapshot.id.clone());
        agg.verbs.extend(verbs.iter().cloned());
        // 不同帖子各自贡献点赞/评论，按帖子累加而不是去重
        agg.vote_sum += snapshot.vote;
        agg.comment_sum += snapshot.comment;
    }
}
