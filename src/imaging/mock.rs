//! Mock 生图客户端（用于测试与 --dry-run）
//!
//! 返回固定字节（一个最小 PNG 头），按提示词片段或调用序号模拟失败，
//! 也可以在某次调用返回一个无法下载的 URL。

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::core::PipelineError;
use crate::imaging::{GeneratedImage, GenerationRequest, ImageGenerator};

/// PNG 文件签名 + 占位数据，足以让下游按文件处理
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, b'l', b'u', b'm', b'e', b'n',
];

/// 本机 1 号端口，连接会被拒绝
pub const UNREACHABLE_IMAGE_URL: &str = "http://127.0.0.1:1/lumen.png";

/// 失败模式
#[derive(Debug, Clone)]
enum FailMode {
    Never,
    Always,
    /// 提示词包含该片段时失败
    PromptContains(String),
    /// 第 n 次调用（从 1 开始）返回瞬时错误，之后恢复
    TransientOnCall(usize),
    /// 第 n 次调用返回无法下载的 URL
    UnreachableUrlOnCall(usize),
}

#[derive(Debug)]
pub struct MockImageGenerator {
    fail: FailMode,
    calls: AtomicUsize,
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self {
            fail: FailMode::Never,
            calls: AtomicUsize::new(0),
        }
    }
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用都返回不可重试错误
    pub fn failing() -> Self {
        Self {
            fail: FailMode::Always,
            ..Self::default()
        }
    }

    pub fn fail_when_prompt_contains(fragment: impl Into<String>) -> Self {
        Self {
            fail: FailMode::PromptContains(fragment.into()),
            ..Self::default()
        }
    }

    pub fn transient_on_call(call: usize) -> Self {
        Self {
            fail: FailMode::TransientOnCall(call),
            ..Self::default()
        }
    }

    pub fn unreachable_url_on_call(call: usize) -> Self {
        Self {
            fail: FailMode::UnreachableUrlOnCall(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    fn name(&self) -> &str {
        "mock-image"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, PipelineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.fail {
            FailMode::Never => {}
            FailMode::Always => {
                return Err(PipelineError::BadRequest("mock generation failure".into()))
            }
            FailMode::PromptContains(fragment) => {
                if request.prompt_text.contains(fragment.as_str()) {
                    return Err(PipelineError::BadRequest(format!(
                        "mock generation rejected prompt containing '{fragment}'"
                    )));
                }
            }
            FailMode::TransientOnCall(n) => {
                if call == *n {
                    return Err(PipelineError::RateLimited("mock rate limit".into()));
                }
            }
            FailMode::UnreachableUrlOnCall(n) => {
                if call == *n {
                    return Ok(GeneratedImage::Url(UNREACHABLE_IMAGE_URL.to_string()));
                }
            }
        }
        Ok(GeneratedImage::Bytes(PLACEHOLDER_PNG.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationSection;

    fn request(text: &str) -> GenerationRequest {
        GenerationRequest::from_config(text, &GenerationSection::default())
    }

    #[tokio::test]
    async fn test_returns_bytes() {
        let generator = MockImageGenerator::new();
        let image = generator.generate(&request("a cat")).await.unwrap();
        assert!(matches!(image, GeneratedImage::Bytes(ref b) if !b.is_empty()));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_fails_on_fragment_only() {
        let generator = MockImageGenerator::fail_when_prompt_contains("forbidden");
        assert!(generator.generate(&request("a cat")).await.is_ok());
        assert!(generator.generate(&request("a forbidden cat")).await.is_err());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retryable() {
        let generator = MockImageGenerator::transient_on_call(1);
        let err = generator.generate(&request("x")).await.unwrap_err();
        assert!(err.is_transient());
        assert!(generator.generate(&request("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_url_download_is_transient() {
        let generator = MockImageGenerator::unreachable_url_on_call(1);
        let image = generator.generate(&request("x")).await.unwrap();
        assert!(matches!(image, GeneratedImage::Url(ref url) if url == UNREACHABLE_IMAGE_URL));

        let store = crate::imaging::ImageStore::new(std::env::temp_dir());
        let err = store.fetch(&image).await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");

        let image = generator.generate(&request("x")).await.unwrap();
        assert!(store.fetch(&image).await.is_ok());
    }
}
