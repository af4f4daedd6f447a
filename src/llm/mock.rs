//! Mock 客户端（用于测试与 --dry-run，无需 API）
//!
//! MockLlmClient 返回固定回复并记录收到的消息；MockDescriber 对任意图片返回固定描述，
//! 可按路径片段模拟失败。

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::PipelineError;
use crate::llm::{ImageDescriber, LlmClient, Message};

const DEFAULT_REPLY: &str = "a richly detailed scene with clear subject, balanced composition and soft natural light";

/// Mock 文本客户端：固定回复
#[derive(Debug)]
pub struct MockLlmClient {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::with_reply(DEFAULT_REPLY)
    }
}

impl MockLlmClient {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用都返回不可重试错误
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 最近一次调用收到的消息
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock-llm"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }
        if self.fail {
            return Err(PipelineError::InvalidResponse("mock llm failure".into()));
        }
        Ok(self.reply.clone())
    }
}

/// Mock 视觉客户端：固定描述
#[derive(Debug)]
pub struct MockDescriber {
    description: String,
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl Default for MockDescriber {
    fn default() -> Self {
        Self::with_description(DEFAULT_REPLY)
    }
}

impl MockDescriber {
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 路径中包含该片段时返回错误（空串表示全部失败）
    pub fn fail_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on = Some(fragment.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDescriber for MockDescriber {
    fn name(&self) -> &str {
        "mock-vision"
    }

    async fn describe(&self, image_path: &Path) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fragment) = &self.fail_on {
            if image_path.to_string_lossy().contains(fragment.as_str()) {
                return Err(PipelineError::InvalidResponse(format!(
                    "mock vision failure for {}",
                    image_path.display()
                )));
            }
        }
        Ok(self.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_records_messages() {
        let llm = MockLlmClient::with_reply("ok");
        let out = llm.complete(&[Message::user("hello")]).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(llm.calls(), 1);
        assert_eq!(llm.last_messages()[0].content, "hello");
    }

    #[tokio::test]
    async fn test_mock_describer_fails_on_fragment() {
        let describer = MockDescriber::with_description("a cat").fail_on("_v1");
        assert!(describer.describe(Path::new("x_iter1_v0.png")).await.is_ok());
        assert!(describer.describe(Path::new("x_iter1_v1.png")).await.is_err());
        assert_eq!(describer.calls(), 2);
    }
}
