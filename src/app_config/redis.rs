use std::env;

use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::Client;

/// Get a Redis multiplexed async connection using REDIS_HOST from env
pub async fn get_redis_connection() -> Result<MultiplexedConnection> {
    let url = env::var("REDIS_HOST").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let client = Client::open(url)?;
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(conn)
}

/// Helper to build a key for a rendered symbol chart
/// 图表缓存键与原始实现保持一致: {symbol}{type}
pub fn chart_cache_key(symbol: &str, symbol_type: &str) -> String {
    format!("{}{}", symbol, symbol_type)
}
