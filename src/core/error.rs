//! 流水线错误类型
//!
//! 所有协作方调用（生图 / 视觉描述 / 提示词改写）与持久化操作都返回 `Result<T, PipelineError>`；
//! 重试循环通过 `is_transient()` 区分可重试（限流、超时、5xx）与不可重试（鉴权、请求错误、响应无效）。

use thiserror::Error;

/// 流水线运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 输入不合法（空提示词、缺字段、阈值配置错误等）
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 上游 5xx 或连接失败（status 为 0 表示未拿到 HTTP 响应）
    #[error("Upstream unavailable ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 响应为空或结构不符合预期
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,
}

impl PipelineError {
    /// 是否为瞬时错误（值得退避重试）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited(_) | PipelineError::Timeout(_) | PipelineError::Upstream { .. }
        )
    }

    /// 根据 HTTP 状态码归类错误
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 => PipelineError::RateLimited(body),
            408 | 504 => PipelineError::Timeout(body),
            401 | 403 => PipelineError::Auth(body),
            500..=599 => PipelineError::Upstream {
                status,
                message: body,
            },
            _ => PipelineError::BadRequest(format!("HTTP {status}: {body}")),
        }
    }

    /// 传输层错误归类（不依赖具体 reqwest 版本，供 async-openai 内部错误复用）
    pub fn from_transport(is_timeout: bool, status: Option<u16>, message: String) -> Self {
        if is_timeout {
            return PipelineError::Timeout(message);
        }
        match status {
            Some(code) => PipelineError::from_status(code, message),
            None => PipelineError::Upstream { status: 0, message },
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return PipelineError::InvalidResponse(e.to_string());
        }
        if e.is_builder() {
            return PipelineError::BadRequest(e.to_string());
        }
        PipelineError::from_transport(e.is_timeout(), e.status().map(|s| s.as_u16()), e.to_string())
    }
}
