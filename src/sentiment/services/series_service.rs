use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::AppError;
use crate::sentiment::model::symbol_daily::{
    split_set, SymbolDailyEntity, SymbolKey, SymbolType,
};
use crate::time_util;

/// 单个符号在一个日期区间 [start, end) 上的时间序列
///
/// 数组长度恒等于 day_span = days_between(start, end)，下标 i 对应
/// start + i 天；区间内没有提及的日子槽位保持 0，而不是缺失。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTimeSeries {
    pub symbol: String,
    pub symbol_type: SymbolType,
    pub threads: BTreeSet<String>,
    pub verbs: BTreeSet<String>,
    pub daily_vote: Vec<i64>,
    pub daily_comment: Vec<i64>,
    pub daily_thread_count: Vec<i64>,
}

impl SymbolTimeSeries {
    fn new(symbol: String, symbol_type: SymbolType, day_span: usize) -> Self {
        Self {
            symbol,
            symbol_type,
            threads: BTreeSet::new(),
            verbs: BTreeSet::new(),
            daily_vote: vec![0; day_span],
            daily_comment: vec![0; day_span],
            daily_thread_count: vec![0; day_span],
        }
    }

    pub fn day_span(&self) -> usize {
        self.daily_vote.len()
    }
}

/// 把区间内的日聚合行折叠成每个 (symbol, type) 一条时间序列
///
/// 槽位下标 = day_span - days_between(end, row.day)，落在区间外的行
/// 直接跳过（上游实现会越界写数组，这里改为显式丢弃）。
pub fn build_series(
    start_ms: i64,
    end_ms: i64,
    rows: &[SymbolDailyEntity],
) -> Result<Vec<SymbolTimeSeries>, AppError> {
    let start = time_util::midnight_ms(start_ms);
    let end = time_util::midnight_ms(end_ms);
    if end <= start {
        return Err(AppError::MalformedInput(format!(
            "invalid date range: start={} end={}",
            start_ms, end_ms
        )));
    }
    let day_span = time_util::days_between(start, end) as usize;

    let mut map: BTreeMap<SymbolKey, SymbolTimeSeries> = BTreeMap::new();

    for row in rows {
        let symbol_type: SymbolType = match row.symbol_type.parse() {
            Ok(ty) => ty,
            Err(_) => {
                warn!("skip row with unknown symbol type: {}", row.symbol_type);
                continue;
            }
        };

        // days_between 取绝对值，end 之后的行会折回窗口内，先显式排除
        if row.day_ts >= end {
            warn!(
                "skip future-dated row: symbol={} day_ts={}",
                row.symbol, row.day_ts
            );
            continue;
        }

        let diff = day_span as i64 - time_util::days_between(end, row.day_ts);
        if diff < 0 || diff >= day_span as i64 {
            warn!(
                "skip out-of-range row: symbol={} day_ts={} diff={}",
                row.symbol, row.day_ts, diff
            );
            continue;
        }
        let idx = diff as usize;

        let key = SymbolKey::new(row.symbol.clone(), symbol_type);
        let series = map
            .entry(key)
            .or_insert_with(|| SymbolTimeSeries::new(row.symbol.clone(), symbol_type, day_span));

        let threads = split_set(&row.threads);
        series.daily_vote[idx] = row.vote_sum;
        series.daily_comment[idx] = row.comment_sum;
        series.daily_thread_count[idx] = threads.len() as i64;
        series.threads.extend(threads);
        series.verbs.extend(split_set(&row.verbs));
    }

    Ok(map.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ONE_DAY_MS;

    fn row(symbol: &str, ty: &str, day_ts: i64, vote: i64, comment: i64, threads: &str) -> SymbolDailyEntity {
        SymbolDailyEntity {
            symbol: symbol.to_string(),
            symbol_type: ty.to_string(),
            day_ts,
            threads: threads.to_string(),
            verbs: "buy,hold".to_string(),
            vote_sum: vote,
            comment_sum: comment,
        }
    }

    #[test]
    fn test_series_length_equals_day_span() {
        let start = 0;
        let end = 30 * ONE_DAY_MS;
        let rows = vec![row("GME", "stock", 3 * ONE_DAY_MS, 10, 2, "a,b")];
        let series = build_series(start, end, &rows).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].day_span(), 30);
        assert_eq!(series[0].daily_vote.len(), 30);
        assert_eq!(series[0].daily_comment.len(), 30);
        assert_eq!(series[0].daily_thread_count.len(), 30);
    }

    #[test]
    fn test_slot_alignment() {
        let start = 0;
        let end = 7 * ONE_DAY_MS;
        let rows = vec![
            // 区间第一天 -> 下标 0
            row("GME", "stock", 0, 5, 1, "a"),
            // 区间最后一天 (end - 1day) -> 下标 day_span - 1
            row("GME", "stock", 6 * ONE_DAY_MS, 40, 8, "b,c"),
        ];
        let series = build_series(start, end, &rows).unwrap();
        let s = &series[0];
        assert_eq!(s.daily_vote[0], 5);
        assert_eq!(s.daily_vote[6], 40);
        assert_eq!(s.daily_thread_count[6], 2);
        // 没有提及的日子保持 0
        assert_eq!(s.daily_vote[3], 0);
    }

    #[test]
    fn test_out_of_range_rows_are_skipped() {
        let start = 0;
        let end = 7 * ONE_DAY_MS;
        let rows = vec![
            // 正好落在 end 上的行会产生越界下标，应被丢弃
            row("GME", "stock", 7 * ONE_DAY_MS, 99, 9, "x"),
            row("GME", "stock", 0, 5, 1, "a"),
        ];
        let series = build_series(start, end, &rows).unwrap();
        let s = &series[0];
        assert!(s.daily_vote.iter().all(|&v| v != 99));
        assert!(!s.threads.contains("x"));
    }

    #[test]
    fn test_future_dated_rows_are_skipped() {
        let start = 0;
        let end = 7 * ONE_DAY_MS;
        let rows = vec![
            // 10d 的行与 4d 的日差相同，折回后会落进槽位 4，必须丢弃而不是覆盖
            row("GME", "stock", 4 * ONE_DAY_MS, 5, 1, "a"),
            row("GME", "stock", 10 * ONE_DAY_MS, 99, 9, "x"),
        ];
        let series = build_series(start, end, &rows).unwrap();
        let s = &series[0];
        assert_eq!(s.daily_vote[4], 5);
        assert!(s.daily_vote.iter().all(|&v| v != 99));
        assert!(!s.threads.contains("x"));
    }

    #[test]
    fn test_sets_union_across_days_order_independent() {
        let start = 0;
        let end = 7 * ONE_DAY_MS;
        let mut rows = vec![
            row("GME", "stock", 0, 5, 1, "a,b"),
            row("GME", "stock", 2 * ONE_DAY_MS, 7, 2, "b,c"),
        ];
        let forward = build_series(start, end, &rows).unwrap();
        rows.reverse();
        let backward = build_series(start, end, &rows).unwrap();

        assert_eq!(forward, backward);
        let threads: Vec<&str> = forward[0].threads.iter().map(|s| s.as_str()).collect();
        assert_eq!(threads, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_same_symbol_text_distinct_types() {
        let start = 0;
        let end = 7 * ONE_DAY_MS;
        let rows = vec![
            row("BTC", "crypto", 0, 5, 1, "a"),
            row("BTC", "other", 0, 6, 2, "b"),
        ];
        let series = build_series(start, end, &rows).unwrap();
        // 同一 ticker 文本、不同类别是两个实体
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_empty_range_rejected() {
        assert!(build_series(ONE_DAY_MS, ONE_DAY_MS, &[]).is_err());
        assert!(build_series(2 * ONE_DAY_MS, ONE_DAY_MS, &[]).is_err());
    }
}
