//! 为缺少 prompt 的场景生成提示词
//!
//! 按目标模型给出不同的写法指导（flux 偏自然语言，sdxl 偏技术关键词，未知模型按 flux 处理），
//! 模型回复经 clean_prompt_text 清洗后写回输入文件。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::core::{PipelineError, RetryPolicy};
use crate::llm::{clean_prompt_text, LlmClient, Message};

const FLUX_GUIDANCE: &str = "For the Flux model:\n\
    - Use natural language descriptions that focus on the visual elements\n\
    - Avoid technical terms like \"4K\" or \"HDR\"\n\
    - Emphasize composition, lighting and mood naturally\n\
    - Don't use explicit style keywords like \"digital art\" or \"photorealistic\"\n\
    - Keep descriptions flowing and conversational";

const SDXL_GUIDANCE: &str = "For the SDXL model:\n\
    - Include technical quality terms (8K, HDR, photorealistic)\n\
    - Use explicit artistic style references\n\
    - Include specific camera details (wide angle, macro, etc.)\n\
    - Add detailed lighting descriptions\n\
    - Explicit style keywords and artist references are fine";

const SYSTEM_PROMPT: &str = "You are an expert at writing prompts for AI image generation. \
    Create concise, visually-focused prompts that describe the scene directly.\n\n\
    Guidelines:\n\
    - Focus purely on visual elements (composition, lighting, colors, subjects)\n\
    - No meta-commentary or explanatory text\n\
    - Don't use phrases like \"a scene of\" or \"an image of\"\n\
    - Start directly with the subject and action\n\
    - Keep the prompt under 100 words";

/// 目标模型对应的写法指导
pub fn model_guidance(model: &str) -> &'static str {
    match model.to_ascii_lowercase().as_str() {
        "sdxl" => SDXL_GUIDANCE,
        _ => FLUX_GUIDANCE,
    }
}

/// 一次 fill_missing 的统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationStats {
    pub total: usize,
    pub generated: usize,
    pub existing: usize,
    pub failed: usize,
    pub default_model: String,
}

impl std::fmt::Display for GenerationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} scenes: {} generated, {} existing, {} failed (default model: {})",
            self.total, self.generated, self.existing, self.failed, self.default_model
        )
    }
}

pub struct PromptGenerator {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    /// 两次生成之间的间隔，避免触发限流
    pacing: Duration,
}

impl PromptGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self {
            llm,
            retry,
            pacing: Duration::from_secs(1),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn generate_prompt(
        &self,
        title: &str,
        scene: &str,
        mood: &str,
        model: &str,
    ) -> Result<String, PipelineError> {
        let messages = vec![
            Message::system(format!("{}\n\n{}", SYSTEM_PROMPT, model_guidance(model))),
            Message::user(format!(
                "Convert this scene description into a focused visual prompt.\n\n\
                 Title: {title}\nScene: {scene}\nMood: {mood}\n\n\
                 Respond with ONLY the prompt text, no additional commentary."
            )),
        ];

        let raw = self
            .retry
            .run("prompt generation", || self.llm.complete(&messages))
            .await?;
        let prompt = clean_prompt_text(&raw);
        if prompt.is_empty() {
            return Err(PipelineError::InvalidResponse(format!(
                "empty prompt generated for '{title}'"
            )));
        }
        Ok(prompt)
    }

    /// 就地补全文档中缺少 prompt 的条目，并为所有条目补上 model
    pub async fn fill_document(
        &self,
        doc: &mut Value,
        configured_model: &str,
    ) -> Result<GenerationStats, PipelineError> {
        let default_model = doc
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(configured_model)
            .to_string();

        let scenes = doc
            .get_mut("prompts")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| PipelineError::InvalidInput("'prompts' array not found".into()))?;

        let mut stats = GenerationStats {
            total: scenes.len(),
            default_model: default_model.clone(),
            ..GenerationStats::default()
        };

        for scene in scenes.iter_mut() {
            let Some(entry) = scene.as_object_mut() else {
                stats.failed += 1;
                continue;
            };
            let field = |key: &str| {
                entry
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let id = field("id");
            let model = Some(field("model"))
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_model.clone());

            if !field("prompt").trim().is_empty() {
                stats.existing += 1;
                entry.insert("model".into(), Value::String(model));
                continue;
            }

            let (title, scene_text, mood) = (field("title"), field("scene"), field("mood"));
            tracing::info!("Generating prompt for scene {} ({})", id, model);
            match self.generate_prompt(&title, &scene_text, &mood, &model).await {
                Ok(prompt) => {
                    entry.insert("prompt".into(), Value::String(prompt));
                    stats.generated += 1;
                }
                Err(e) => {
                    tracing::error!("Prompt generation failed for scene {}: {}", id, e);
                    stats.failed += 1;
                }
            }
            entry.insert("model".into(), Value::String(model));

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        Ok(stats)
    }

    /// 读取 input，补全后写入 output（缺省覆盖 input）
    pub async fn fill_missing(
        &self,
        input: &Path,
        output: Option<&Path>,
        configured_model: &str,
    ) -> Result<GenerationStats, PipelineError> {
        let content = tokio::fs::read_to_string(input).await?;
        let mut doc: Value = serde_json::from_str(&content)?;
        let stats = self.fill_document(&mut doc, configured_model).await?;

        let target = output.unwrap_or(input);
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(target, serde_json::to_string_pretty(&doc)?).await?;
        tracing::info!("{} -> {}", stats, target.display());
        Ok(stats)
    }
}
