use thiserror::Error;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 上游数据错误（数据库/标签解析），聚合过程不允许半程落地
    #[error("upstream data error: {0}")]
    Upstream(String),

    /// 请求参数错误（日期、区间、类型），直接拒绝，不重试
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// 调度周期执行失败，checkpoint 已前移，下一轮照常调度
    #[error("schedule failure: {0}")]
    Schedule(String),

    /// 未知错误
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// 把任何错误转换为AppError类型
pub fn to_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> AppError {
    AppError::Unknown(err.to_string())
}

impl From<rbatis::rbdc::Error> for AppError {
    fn from(err: rbatis::rbdc::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}
