use anyhow::anyhow;
use rbatis::rbdc::db::ExecResult;
use rbatis::{crud, impl_select, RBatis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_config;
use crate::error::AppError;

/// 与 `thread_stat` 表对应的实体结构
///
/// CREATE TABLE `thread_stat` (
///   `id` varchar(255) NOT NULL COMMENT '帖子id',
///   `vote` bigint NOT NULL COMMENT '点赞数',
///   `comment` bigint NOT NULL COMMENT '评论数',
///   `updated` bigint NOT NULL COMMENT '采样时间，毫秒时间戳',
///   `forum` varchar(255) DEFAULT NULL COMMENT '板块'
/// ) ...
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ThreadStatEntity {
    // 帖子id
    pub id: String,
    // 点赞数
    pub vote: i64,
    // 评论数
    pub comment: i64,
    // 采样时间（毫秒时间戳）
    pub updated: i64,
    // 板块
    pub forum: Option<String>,
}

crud!(ThreadStatEntity {}, "thread_stat");

impl_select!(ThreadStatEntity{select_by_thread(id: &str) => "`where id = #{id} order by updated desc`"},"thread_stat");

/// 帖子快照 + 标题的联表查询结果，日度抽取的输入
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ThreadSnapshot {
    pub id: String,
    pub title: String,
    pub vote: i64,
    pub comment: i64,
    pub updated: i64,
}

/// 一段时间内每个帖子的最大/最小点赞与评论
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ThreadStatMaxMin {
    pub id: String,
    pub max_vote: i64,
    pub max_comment: i64,
    pub min_vote: i64,
    pub min_comment: i64,
}

pub struct ThreadStatModel {
    db: &'static RBatis,
}

impl ThreadStatModel {
    /// 初始化model
    pub async fn new() -> Self {
        Self {
            db: app_config::db::get_db_client(),
        }
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        let query = "select count(1) from thread_stat";
        let res: u64 = self.db.query_decode(query, vec![]).await?;
        Ok(res)
    }

    pub async fn latest_updated(&self) -> Result<Option<i64>, AppError> {
        let query = "select max(updated) from thread_stat";
        let res: Option<i64> = self.db.query_decode(query, vec![]).await?;
        Ok(res)
    }

    pub async fn by_thread(&self, id: &str) -> Result<Vec<ThreadStatEntity>, AppError> {
        let res = ThreadStatEntity::select_by_thread(self.db, id).await?;
        Ok(res)
    }

    /// 取一个时间窗口内的全部快照，联 `thread` 表带出标题
    pub async fn list_range_with_title(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ThreadSnapshot>, AppError> {
        let query = "select s.id, t.title, s.vote, s.comment, s.updated \
                     from thread_stat s \
                     join thread t on s.id = t.id \
                     where s.updated >= ? and s.updated < ? \
                     order by s.updated desc";
        debug!("query: {} [{}, {})", query, start_ms, end_ms);
        let res: Vec<ThreadSnapshot> = self
            .db
            .query_decode(query, vec![start_ms.into(), end_ms.into()])
            .await?;
        Ok(res)
    }

    /// 按帖子分组的最大/最小点赞与评论
    pub async fn max_and_min(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ThreadStatMaxMin>, AppError> {
        let query = "select id, \
                     max(vote) as max_vote, max(comment) as max_comment, \
                     min(vote) as min_vote, min(comment) as min_comment \
                     from thread_stat \
                     where updated >= ? and updated < ? \
                     group by id";
        let res: Vec<ThreadStatMaxMin> = self
            .db
            .query_decode(query, vec![start_ms.into(), end_ms.into()])
            .await?;
        Ok(res)
    }

    /// 批量插入
    pub async fn save_batch(&self, list: &Vec<ThreadStatEntity>) -> anyhow::Result<ExecResult> {
        if list.is_empty() {
            return Err(anyhow!("thread stat list is empty"));
        }
        let data = ThreadStatEntity::insert_batch(self.db, list, list.len() as u64).await?;
        Ok(data)
    }
}
