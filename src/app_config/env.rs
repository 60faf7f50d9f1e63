use std::env;

/// 读取布尔型环境变量：支持 true/false/1/0（大小写不敏感），
/// 未设置或无法解析时返回默认值
pub fn env_is_true(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => {
            let v = v.trim();
            if v.eq_ignore_ascii_case("true") || v == "1" {
                true
            } else if v.eq_ignore_ascii_case("false") || v == "0" {
                false
            } else {
                default
            }
        }
        Err(_) => default,
    }
}

/// 读取字符串环境变量，若不存在则返回默认值
pub fn env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) => v,
        Err(_) => default.to_string(),
    }
}

/// 读取整型环境变量，解析失败时返回默认值
pub fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}
