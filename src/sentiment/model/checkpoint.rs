use std::sync::Mutex;

use async_trait::async_trait;
use rbatis::RBatis;
use serde::{Deserialize, Serialize};

use crate::app_config;
use crate::error::AppError;

/// 抽取调度的持久化 checkpoint，单行记录
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct IngestCheckpointEntity {
    pub id: i64,
    pub last_ingested_at: i64,
}

/// 抽象：checkpoint 存取接口，调度器通过注入使用，便于测试替换
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<i64>, AppError>;
    async fn save(&self, last_ingested_at: i64) -> Result<(), AppError>;
}

/// 具体实现：MySQL 单行 upsert
pub struct MysqlCheckpointStore {
    db: &'static RBatis,
}

impl MysqlCheckpointStore {
    pub async fn new() -> Self {
        Self {
            db: app_config::db::get_db_client(),
        }
    }

    pub async fn create_table(&self) -> Result<(), AppError> {
        let create_table_sql = "CREATE TABLE IF NOT EXISTS `ingest_checkpoint` (
            `id` int NOT NULL,
            `last_ingested_at` bigint NOT NULL COMMENT '最近一次抽取启动时间，毫秒时间戳',
            PRIMARY KEY (`id`)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;";
        self.db.exec(create_table_sql, vec![]).await?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for MysqlCheckpointStore {
    async fn load(&self) -> Result<Option<i64>, AppError> {
        let query = "select last_ingested_at from ingest_checkpoint where id = 1";
        let res: Option<i64> = self.db.query_decode(query, vec![]).await?;
        Ok(res)
    }

    async fn save(&self, last_ingested_at: i64) -> Result<(), AppError> {
        let query = "insert into ingest_checkpoint (id, last_ingested_at) values (1, ?) \
                     on duplicate key update last_ingested_at = values(last_ingested_at)";
        self.db.exec(query, vec![last_ingested_at.into()]).await?;
        Ok(())
    }
}

/// 具体实现：进程内存，LOCAL 环境与测试使用
#[derive(Default)]
pub struct MemoryCheckpointStore {
    value: Mutex<Option<i64>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(last_ingested_at: i64) -> Self {
        Self {
            value: Mutex::new(Some(last_ingested_at)),
        }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<i64>, AppError> {
        Ok(*self.value.lock().unwrap())
    }

    async fn save(&self, last_ingested_at: i64) -> Result<(), AppError> {
        *self.value.lock().unwrap() = Some(last_ingested_at);
        Ok(())
    }
}
