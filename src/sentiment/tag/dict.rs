use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

/// 股票符号 -> 公司名，内嵌字典
pub static STOCK_DICT: Lazy<HashMap<String, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("stock_dict.json")).expect("stock_dict.json is invalid")
});

/// 加密货币符号集合
pub static CRYPTO_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "BTC", "ETH", "DOGE", "ADA", "SOL", "XRP", "LTC", "BNB", "DOT", "SHIB", "AVAX", "LINK",
        "MATIC", "ATOM", "XLM", "ETC", "UNI", "FIL",
    ]
    .into_iter()
    .collect()
});

/// 情绪动词集合，小写匹配
pub static VERB_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "buy", "sell", "hold", "hodl", "moon", "pump", "dump", "short", "long", "call", "put",
        "yolo", "squeeze", "crash", "rally", "dip", "ape", "bull", "bear",
    ]
    .into_iter()
    .collect()
});

/// 查询符号的展示名，仅股票字典有展示名
pub fn display_name(symbol: &str) -> Option<String> {
    STOCK_DICT.get(symbol).cloned()
}
