use chrono::{NaiveDate, TimeZone, Utc};

use crate::ONE_DAY_MS;

/// 把毫秒时间戳对齐到当天 UTC 零点
pub fn midnight_ms(ts_ms: i64) -> i64 {
    ts_ms - ts_ms.rem_euclid(ONE_DAY_MS)
}

/// 解析 "YYYY-MM-DD" 为当天 UTC 零点的毫秒时间戳
pub fn parse_to_midnight(date: &str) -> Result<i64, String> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", date, e))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date '{}'", date))?;
    Ok(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

/// 两个时间戳之间的自然日差（先对齐零点再求差，绝对值）
pub fn days_between(a_ms: i64, b_ms: i64) -> i64 {
    (midnight_ms(a_ms) - midnight_ms(b_ms)).abs() / ONE_DAY_MS
}

/// 下一个自然日的同一时刻
pub fn next_day_ms(ts_ms: i64) -> i64 {
    ts_ms + ONE_DAY_MS
}

pub fn mill_time_to_datetime(timestamp_ms: i64) -> Result<String, String> {
    match Utc.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(datetime) => {
            let formatted_datetime = datetime.format("%Y-%m-%d %H:%M:%S").to_string();
            Ok(formatted_datetime)
        }
        chrono::LocalResult::None => Err("Invalid timestamp: None".to_string()),
        chrono::LocalResult::Ambiguous(_, _) => Err("Invalid timestamp: Ambiguous".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_to_midnight() {
        let ts = parse_to_midnight("2024-05-01").unwrap();
        assert_eq!(ts % ONE_DAY_MS, 0);
        assert_eq!(mill_time_to_datetime(ts).unwrap(), "2024-05-01 00:00:00");
    }

    #[test]
    fn test_days_between() {
        let start = parse_to_midnight("2024-05-01").unwrap();
        let end = parse_to_midnight("2024-05-31").unwrap();
        assert_eq!(days_between(start, end), 30);
        assert_eq!(days_between(end, start), 30);
        // 同一天内的不同时刻差为 0
        assert_eq!(days_between(start, start + 3600_000), 0);
    }

    #[test]
    fn test_midnight_ms() {
        let ts = parse_to_midnight("2024-05-01").unwrap() + 13 * 3600_000;
        assert_eq!(midnight_ms(ts), parse_to_midnight("2024-05-01").unwrap());
    }
}
