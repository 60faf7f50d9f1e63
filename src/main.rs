use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;

use symbol_radar::app::bootstrap;
use symbol_radar::app_config::db::init_db;
use symbol_radar::app_config::log::setup_logging;
use symbol_radar::error::AppError;
use symbol_radar::sentiment::cache::chart_cache::InMemoryRedisChartCache;
use symbol_radar::sentiment::model::symbol_daily::{SymbolDailyModel, SymbolType};
use symbol_radar::sentiment::services::report_service::ReportService;
use symbol_radar::sentiment::task::ingest_job;
use symbol_radar::time_util;

#[derive(Parser)]
#[command(name = "symbol_radar", about = "帖子情绪 -> 符号日度聚合与尖峰报表")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 常驻运行：抽取调度循环
    Run,
    /// 手动触发一次日度抽取
    Ingest {
        /// 目标日期 YYYY-MM-DD，缺省为今天
        #[arg(long)]
        date: Option<String>,
    },
    /// 构建一段区间的符号报表并输出 JSON
    Report {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// stock/crypto/other
        #[arg(long)]
        r#type: Option<String>,
        /// 显式指定符号，绕过尖峰过滤
        #[arg(long)]
        symbol: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    setup_logging().await?;

    let cli = Cli::parse();
    init_db().await;
    SymbolDailyModel::new().await.create_table().await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => bootstrap::run().await?,
        Command::Ingest { date } => {
            let day_ts = match date {
                Some(d) => Some(
                    time_util::parse_to_midnight(&d).map_err(AppError::MalformedInput)?,
                ),
                None => None,
            };
            let count = ingest_job::run_ingestion_cycle(day_ts).await?;
            info!("manual ingest done: {} aggregates", count);
        }
        Command::Report {
            start,
            end,
            r#type,
            symbol,
        } => {
            let start_ms =
                time_util::parse_to_midnight(&start).map_err(AppError::MalformedInput)?;
            let end_ms = time_util::parse_to_midnight(&end).map_err(AppError::MalformedInput)?;
            let requested_type: Option<SymbolType> =
                r#type.as_deref().map(str::parse).transpose()?;

            let service = ReportService::new(Arc::new(InMemoryRedisChartCache::new()));
            let reports = service
                .build_reports(start_ms, end_ms, requested_type, symbol.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    Ok(())
}
