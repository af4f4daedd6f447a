//! 文生图层：请求参数、结果类型、ImageGenerator 抽象，fal.ai 实现与 Mock，以及产物落盘

pub mod fal;
pub mod mock;
pub mod output;

use async_trait::async_trait;

use crate::config::GenerationSection;
use crate::core::PipelineError;

pub use fal::FalClient;
pub use mock::MockImageGenerator;
pub use output::ImageStore;

/// 一次生图请求
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub negative_prompt: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub width: u32,
    pub height: u32,
}

impl GenerationRequest {
    /// 用配置中的默认参数包装提示词
    pub fn from_config(prompt_text: impl Into<String>, section: &GenerationSection) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            negative_prompt: section.negative_prompt.clone(),
            num_inference_steps: section.num_inference_steps,
            guidance_scale: section.guidance_scale,
            width: section.width,
            height: section.height,
        }
    }
}

/// 生图结果：远端 URL（需下载）或直接返回的字节
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedImage {
    Url(String),
    Bytes(Vec<u8>),
}

/// 文生图协作方
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, PipelineError>;

    /// 用于 api_calls 记录的后端名
    fn name(&self) -> &str;
}
