//! 远程建议错误类型

use thiserror::Error;

/// 远程建议错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuggestionError {
    /// 服务限流（HTTP 429）
    #[error("Suggestion service rate limited")]
    RateLimited,

    /// 返回内容无法解析或建议不合法
    #[error("Invalid suggestion: {0}")]
    Invalid(String),

    /// 网络或服务故障
    #[error("Suggestion service unavailable: {0}")]
    NetworkFailure(String),
}
