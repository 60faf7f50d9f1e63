use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rbatis::rbdc::db::ExecResult;
use rbatis::{crud, impl_select, RBatis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_config;
use crate::error::AppError;

/// 符号类别，(symbol, type) 才是符号的完整身份
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
    Stock,
    Crypto,
    Other,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Stock => "stock",
            SymbolType::Crypto => "crypto",
            SymbolType::Other => "other",
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SymbolType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock" => Ok(SymbolType::Stock),
            "crypto" => Ok(SymbolType::Crypto),
            "other" => Ok(SymbolType::Other),
            _ => Err(AppError::MalformedInput(format!(
                "unknown symbol type: {}",
                s
            ))),
        }
    }
}

/// (symbol, type) 组合键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub symbol: String,
    pub symbol_type: SymbolType,
}

impl SymbolKey {
    pub fn new(symbol: impl Into<String>, symbol_type: SymbolType) -> Self {
        Self {
            symbol: symbol.into(),
            symbol_type,
        }
    }
}

/// 单个符号单个自然日的聚合结果（内存态，集合去重）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySymbolAggregate {
    pub symbol: String,
    pub symbol_type: SymbolType,
    /// 当天零点的毫秒时间戳
    pub day_ts: i64,
    pub threads: BTreeSet<String>,
    pub verbs: BTreeSet<String>,
    pub vote_sum: i64,
    pub comment_sum: i64,
}

impl DailySymbolAggregate {
    pub fn new(symbol: impl Into<String>, symbol_type: SymbolType, day_ts: i64) -> Self {
        Self {
            symbol: symbol.into(),
            symbol_type,
            day_ts,
            threads: BTreeSet::new(),
            verbs: BTreeSet::new(),
            vote_sum: 0,
            comment_sum: 0,
        }
    }

    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(self.symbol.clone(), self.symbol_type)
    }

    pub fn to_entity(&self) -> SymbolDailyEntity {
        SymbolDailyEntity {
            symbol: self.symbol.clone(),
            symbol_type: self.symbol_type.as_str().to_string(),
            day_ts: self.day_ts,
            threads: join_set(&self.threads),
            verbs: join_set(&self.verbs),
            vote_sum: self.vote_sum,
            comment_sum: self.comment_sum,
        }
    }

    pub fn from_entity(entity: &SymbolDailyEntity) -> Result<Self, AppError> {
        Ok(Self {
            symbol: entity.symbol.clone(),
            symbol_type: entity.symbol_type.parse()?,
            day_ts: entity.day_ts,
            threads: split_set(&entity.threads),
            verbs: split_set(&entity.verbs),
            vote_sum: entity.vote_sum,
            comment_sum: entity.comment_sum,
        })
    }
}

/// 集合落库格式与原始存储保持一致：逗号拼接
pub fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(",")
}

pub fn split_set(joined: &str) -> BTreeSet<String> {
    joined
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// 与 `symbol_daily` 表对应的实体结构
///
/// CREATE TABLE `symbol_daily` (
///   `symbol` varchar(32) NOT NULL COMMENT '符号',
///   `symbol_type` varchar(16) NOT NULL COMMENT '类别 stock/crypto/other',
///   `day_ts` bigint NOT NULL COMMENT '当天零点，毫秒时间戳',
///   `threads` text NOT NULL COMMENT '帖子id集合，逗号拼接',
///   `verbs` text NOT NULL COMMENT '情绪动词集合，逗号拼接',
///   `vote_sum` bigint NOT NULL COMMENT '当天点赞总和',
///   `comment_sum` bigint NOT NULL COMMENT '当天评论总和'
/// ) ...
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct SymbolDailyEntity {
    pub symbol: String,
    pub symbol_type: String,
    pub day_ts: i64,
    pub threads: String,
    pub verbs: String,
    pub vote_sum: i64,
    pub comment_sum: i64,
}

crud!(SymbolDailyEntity {}, "symbol_daily");

impl_select!(SymbolDailyEntity{select_range(start: i64, end: i64) => "`where day_ts >= #{start} and day_ts < #{end} order by day_ts asc`"},"symbol_daily");

impl_select!(SymbolDailyEntity{select_range_by_type(start: i64, end: i64, symbol_type: &str) => "`where day_ts >= #{start} and day_ts < #{end} and symbol_type = #{symbol_type} order by day_ts asc`"},"symbol_daily");

impl_select!(SymbolDailyEntity{select_range_by_symbol(start: i64, end: i64, symbol: &str) => "`where day_ts >= #{start} and day_ts < #{end} and symbol = #{symbol} order by day_ts asc`"},"symbol_daily");

pub struct SymbolDailyModel {
    db: &'static RBatis,
}

impl SymbolDailyModel {
    /// 初始化model
    pub async fn new() -> Self {
        Self {
            db: app_config::db::get_db_client(),
        }
    }

    pub async fn create_table(&self) -> Result<ExecResult, AppError> {
        let create_table_sql = "CREATE TABLE IF NOT EXISTS `symbol_daily` (
            `id` int NOT NULL AUTO_INCREMENT,
            `symbol` varchar(32) NOT NULL COMMENT '符号',
            `symbol_type` varchar(16) NOT NULL COMMENT '类别 stock/crypto/other',
            `day_ts` bigint NOT NULL COMMENT '当天零点，毫秒时间戳',
            `threads` text NOT NULL COMMENT '帖子id集合，逗号拼接',
            `verbs` text NOT NULL COMMENT '情绪动词集合，逗号拼接',
            `vote_sum` bigint NOT NULL COMMENT '当天点赞总和',
            `comment_sum` bigint NOT NULL COMMENT '当天评论总和',
            `created_at` datetime NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (`id`),
            KEY `idx_day_type` (`day_ts`, `symbol_type`)
        ) ENGINE=InnoDB AUTO_INCREMENT=1 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci;";
        let res = self.db.exec(create_table_sql, vec![]).await?;
        Ok(res)
    }

    /// 批量插入
    pub async fn add_list(&self, list: &Vec<SymbolDailyEntity>) -> anyhow::Result<u64> {
        if list.is_empty() {
            return Ok(0);
        }
        let data = SymbolDailyEntity::insert_batch(self.db, list, list.len() as u64).await?;
        debug!("insert_batch rows_affected = {}", data.rows_affected);
        Ok(data.rows_affected)
    }

    /// 按日期区间查询，可选按类别过滤
    pub async fn list_range(
        &self,
        start_ms: i64,
        end_ms: i64,
        symbol_type: Option<&str>,
    ) -> Result<Vec<SymbolDailyEntity>, AppError> {
        let res = match symbol_type {
            Some(ty) => {
                SymbolDailyEntity::select_range_by_type(self.db, start_ms, end_ms, ty).await?
            }
            None => SymbolDailyEntity::select_range(self.db, start_ms, end_ms).await?,
        };
        Ok(res)
    }

    pub async fn list_range_by_symbol(
        &self,
        start_ms: i64,
        end_ms: i64,
        symbol: &str,
    ) -> Result<Vec<SymbolDailyEntity>, AppError> {
        let res = SymbolDailyEntity::select_range_by_symbol(self.db, start_ms, end_ms, symbol).await?;
        Ok(res)
    }

    /// 删除某一天的全部聚合行，重跑时先清再插，保证幂等
    pub async fn delete_day(&self, day_ts: i64) -> Result<u64, AppError> {
        let res = self
            .db
            .exec("delete from symbol_daily where day_ts = ?", vec![day_ts.into()])
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_type_round_trip() {
        for ty in [SymbolType::Stock, SymbolType::Crypto, SymbolType::Other] {
            assert_eq!(ty.as_str().parse::<SymbolType>().unwrap(), ty);
        }
        assert!("bond".parse::<SymbolType>().is_err());
    }

    #[test]
    fn test_entity_round_trip_keeps_sets() {
        let mut agg = DailySymbolAggregate::new("GME", SymbolType::Stock, 1_700_000_000_000);
        agg.threads.insert("t2".to_string());
        agg.threads.insert("t1".to_string());
        agg.threads.insert("t1".to_string());
        agg.verbs.insert("buy".to_string());
        agg.vote_sum = 42;
        agg.comment_sum = 7;

        let entity = agg.to_entity();
        assert_eq!(entity.threads, "t1,t2");

        let back = DailySymbolAggregate::from_entity(&entity).unwrap();
        assert_eq!(back, agg);
    }

    #[test]
    fn test_split_set_ignores_empty() {
        assert!(split_set("").is_empty());
        assert_eq!(split_set("a,,b").len(), 2);
    }
}
