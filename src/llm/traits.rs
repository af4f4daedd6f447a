//! LLM 与视觉模型的客户端抽象
//!
//! 文本后端实现 LlmClient（提示词生成、改写）；视觉后端实现 ImageDescriber（看图描述）。
//! 两者都返回 `Result<_, PipelineError>`，由调用方的 RetryPolicy 决定是否重试。

use std::path::Path;

use async_trait::async_trait;

use crate::core::PipelineError;
use crate::llm::Message;

/// 文本 LLM 客户端：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, PipelineError>;

    /// 用于 api_calls 记录的后端名
    fn name(&self) -> &str {
        "llm"
    }

    /// 累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 视觉描述客户端：读取本地图片，返回自由文本描述
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image_path: &Path) -> Result<String, PipelineError>;

    fn name(&self) -> &str {
        "vision"
    }
}
