//! 提示词改写
//!
//! 持有 LLM 与 prompt 模板，refine(original, evaluation) 把原始提示词与图片描述（附带评分反馈）
//! 填进模板，返回清洗后的新提示词。是否需要改写由 grader 的 needs_refinement 决定，这里不做判断。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{PipelineError, RetryPolicy};
use crate::llm::{clean_prompt_text, LlmClient, Message};

pub const DEFAULT_REFINE_TEMPLATE: &str = "You are improving a text-to-image prompt. \
The image generated from the original prompt was described by a vision model as shown below.\n\
Minor variations are acceptable; focus on significant deviations:\n\
- elements explicitly requested in the prompt that are missing from the description\n\
- prominent elements in the description that the prompt did not ask for\n\
- large differences in key elements (wrong subject, wrong scene)\n\n\
Original Prompt: {original}\n\
Image Description: {evaluation}\n\n\
Respond with ONLY the revised prompt text.";

/// 改写协作方
#[async_trait]
pub trait PromptRefiner: Send + Sync {
    async fn refine(&self, original_prompt: &str, evaluation_text: &str) -> Result<String, PipelineError>;

    fn name(&self) -> &str {
        "refiner"
    }
}

pub struct LlmPromptRefiner {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
    retry: RetryPolicy,
}

impl LlmPromptRefiner {
    pub fn new(llm: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self {
            llm,
            prompt_template: DEFAULT_REFINE_TEMPLATE.to_string(),
            retry,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    fn render(&self, original_prompt: &str, evaluation_text: &str) -> String {
        self.prompt_template
            .replace("{original}", original_prompt)
            .replace("{evaluation}", evaluation_text)
    }
}

#[async_trait]
impl PromptRefiner for LlmPromptRefiner {
    fn name(&self) -> &str {
        self.llm.name()
    }

    async fn refine(&self, original_prompt: &str, evaluation_text: &str) -> Result<String, PipelineError> {
        if evaluation_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "no evaluation text to refine against".into(),
            ));
        }
        let messages = vec![Message::user(self.render(original_prompt, evaluation_text))];
        let response = self
            .retry
            .run("prompt refinement", || self.llm.complete(&messages))
            .await?;

        let refined = clean_prompt_text(&response);
        if refined.is_empty() {
            return Err(PipelineError::InvalidResponse(
                "refinement returned no prompt text".into(),
            ));
        }
        Ok(refined)
    }
}
