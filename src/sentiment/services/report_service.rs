use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::app_config::env::env_i64;
use crate::app_config::redis::chart_cache_key;
use crate::error::AppError;
use crate::sentiment::cache::chart_cache::{ChartCacheProvider, ChartMemoizer};
use crate::sentiment::chart::sparkline::{
    ChartRenderer, SvgSparklineRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH,
};
use crate::sentiment::model::symbol_daily::{SymbolDailyModel, SymbolType};
use crate::sentiment::services::series_service::{build_series, SymbolTimeSeries};
use crate::sentiment::tag::dict;
use crate::time_util;

/// 报表要求的最小区间天数，周回看窗口需要 7 个槽位
pub const MIN_REPORT_DAY_SPAN: i64 = 7;

/// 尖峰过滤默认阈值
pub const DEFAULT_SPIKE_THRESHOLD: i64 = 20;

/// 日/周/月三个视角上的值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HorizonValues<T> {
    pub day: T,
    pub week: T,
    pub month: T,
}

/// 相对变化（比值）。除零不做保护，结果可能是 inf/NaN，由调用方处理
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeMetrics {
    pub vote: HorizonValues<f64>,
    pub comment: HorizonValues<f64>,
}

/// 绝对量，尖峰检测的输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuantityMetrics {
    pub vote: HorizonValues<i64>,
    pub comment: HorizonValues<i64>,
}

/// 最终上报单元
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub name: Option<String>,
    pub symbol_type: SymbolType,
    pub change: ChangeMetrics,
    pub quantity: QuantityMetrics,
    pub threads: Vec<String>,
    pub verbs: Vec<String>,
    pub chart: String,
}

/// 尖峰过滤配置，阈值可调而不用改逻辑
#[derive(Debug, Clone, Copy)]
pub struct SpikeFilterConfig {
    pub threshold: i64,
}

impl SpikeFilterConfig {
    pub fn from_env() -> Self {
        Self {
            threshold: env_i64("SPIKE_THRESHOLD", DEFAULT_SPIKE_THRESHOLD),
        }
    }
}

impl Default for SpikeFilterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SPIKE_THRESHOLD,
        }
    }
}

/// 绝对量：day = 最后一天，week = 7 天回看，month = 区间起点
///
/// 回看下标对区间长度不足时收敛到 0（短区间退化为月视角）
pub fn compute_quantity(series: &[i64]) -> HorizonValues<i64> {
    if series.is_empty() {
        return HorizonValues {
            day: 0,
            week: 0,
            month: 0,
        };
    }
    let last = series.len() - 1;
    HorizonValues {
        day: series[last],
        week: series[last.saturating_sub(6)],
        month: series[0],
    }
}

/// 相对变化：分母为各视角的参照值，除零不做保护
pub fn compute_change(series: &[i64]) -> HorizonValues<f64> {
    if series.is_empty() {
        return HorizonValues {
            day: 0.0,
            week: 0.0,
            month: 0.0,
        };
    }
    let last = series.len() - 1;
    let latest = series[last] as f64;
    let ratio = |reference: f64| (latest - reference) / reference;
    HorizonValues {
        day: ratio(series[last.saturating_sub(1)] as f64),
        week: ratio(series[last.saturating_sub(6)] as f64),
        month: ratio(series[0] as f64),
    }
}

/// 尖峰过滤：
/// - 显式指定符号时完全绕过过滤
/// - 日点赞/日评论/周点赞任一超过阈值即保留
/// - 周评论超过阈值时还要求类别与请求过滤的类别一致（不对称分支，按原始行为保留）
pub fn is_reportable(
    quantity: &QuantityMetrics,
    symbol_type: SymbolType,
    requested_type: Option<SymbolType>,
    explicit_symbol: bool,
    config: &SpikeFilterConfig,
) -> bool {
    if explicit_symbol {
        return true;
    }
    let t = config.threshold;
    let type_matches = requested_type.map_or(true, |rt| rt == symbol_type);
    quantity.vote.day > t
        || quantity.comment.day > t
        || quantity.vote.week > t
        || (quantity.comment.week > t && type_matches)
}

/// 读路径报表服务：时间序列 -> 变化指标 -> 尖峰过滤 -> 图表
pub struct ReportService {
    memoizer: ChartMemoizer,
    filter: SpikeFilterConfig,
}

impl ReportService {
    pub fn new(cache: Arc<dyn ChartCacheProvider>) -> Self {
        let renderer: Arc<dyn ChartRenderer> = Arc::new(SvgSparklineRenderer::new());
        Self {
            memoizer: ChartMemoizer::new(cache, renderer, DEFAULT_WIDTH, DEFAULT_HEIGHT),
            filter: SpikeFilterConfig::from_env(),
        }
    }

    pub fn with_parts(memoizer: ChartMemoizer, filter: SpikeFilterConfig) -> Self {
        Self { memoizer, filter }
    }

    /// 构建 [start, end) 区间的符号报表
    ///
    /// symbol 显式指定时只查该符号且绕过尖峰过滤；否则按类别过滤。
    /// 区间不足 7 天直接拒绝，周回看窗口无法成立。
    pub async fn build_reports(
        &self,
        start_ms: i64,
        end_ms: i64,
        requested_type: Option<SymbolType>,
        symbol: Option<&str>,
    ) -> Result<Vec<SymbolReport>, AppError> {
        let start = time_util::midnight_ms(start_ms);
        let end = time_util::midnight_ms(end_ms);
        let day_span = time_util::days_between(start, end);
        if end <= start || day_span < MIN_REPORT_DAY_SPAN {
            return Err(AppError::MalformedInput(format!(
                "date range must span at least {} days, got {}",
                MIN_REPORT_DAY_SPAN, day_span
            )));
        }

        let model = SymbolDailyModel::new().await;
        let rows = match symbol {
            Some(s) => model.list_range_by_symbol(start, end, s).await?,
            None => {
                model
                    .list_range(start, end, requested_type.map(|t| t.as_str()))
                    .await?
            }
        };
        info!("build reports: {} rows in [{}, {})", rows.len(), start, end);

        let series_list = build_series(start, end, &rows)?;
        let mut reports = Vec::new();
        for series in series_list {
            if let Some(report) = self
                .build_one(&series, requested_type, symbol.is_some())
                .await?
            {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    async fn build_one(
        &self,
        series: &SymbolTimeSeries,
        requested_type: Option<SymbolType>,
        explicit_symbol: bool,
    ) -> Result<Option<SymbolReport>, AppError> {
        let quantity = QuantityMetrics {
            vote: compute_quantity(&series.daily_vote),
            comment: compute_quantity(&series.daily_comment),
        };
        if !is_reportable(
            &quantity,
            series.symbol_type,
            requested_type,
            explicit_symbol,
            &self.filter,
        ) {
            return Ok(None);
        }

        let change = ChangeMetrics {
            vote: compute_change(&series.daily_vote),
            comment: compute_change(&series.daily_comment),
        };

        let key = chart_cache_key(&series.symbol, series.symbol_type.as_str());
        let chart = self.memoizer.get_or_render(&key, &series.daily_vote).await?;

        Ok(Some(SymbolReport {
            symbol: series.symbol.clone(),
            name: dict::display_name(&series.symbol),
            symbol_type: series.symbol_type,
            change,
            quantity,
            threads: series.threads.iter().cloned().collect(),
            verbs: series.verbs.iter().cloned().collect(),
            chart,
        }))
    }
}
