#![allow(dead_code)]
#![allow(unused_variables)]
#![allow(unused_imports)]

pub mod app;
pub mod app_config;
pub mod error;
pub mod sentiment;
pub mod time_util;

/// 本地环境标识
pub const ENVIRONMENT_LOCAL: &str = "LOCAL";

/// 一天的毫秒数
pub const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;
