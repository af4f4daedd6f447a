//! 流水线构建器：统一的组件装配逻辑
//!
//! CLI 的各个子命令与集成测试共用同一套装配；`dry_run` 时所有托管协作方换成 Mock，
//! 无需任何密钥即可离线跑完整条流水线。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{self, AppConfig};
use crate::core::{PipelineError, RetryPolicy, TaskScheduler};
use crate::imaging::{FalClient, ImageGenerator, MockImageGenerator};
use crate::llm::{ImageDescriber, LlmClient, MockDescriber, MockLlmClient, OpenAiClient, OpenAiVisionClient};
use crate::pipeline::{LlmPromptRefiner, Pipeline};
use crate::prompts::PromptGenerator;
use crate::store::SqliteStore;

/// 流水线构建器
pub struct PipelineBuilder {
    config: Arc<AppConfig>,
    dry_run: bool,
    cancel: CancellationToken,
    llm: Option<Arc<dyn LlmClient>>,
    generator: Option<Arc<dyn ImageGenerator>>,
    describer: Option<Arc<dyn ImageDescriber>>,
}

impl PipelineBuilder {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            dry_run: false,
            cancel: CancellationToken::new(),
            llm: None,
            generator: None,
            describer: None,
        }
    }

    /// 使用 Mock 协作方
    pub fn dry_run(mut self, enable: bool) -> Self {
        self.dry_run = enable;
        self
    }

    /// 关闭令牌（通常来自 ShutdownManager）
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 文本 LLM：GEMINI_API_KEY / OPENAI_API_KEY 必须存在（dry_run 除外）
    pub fn build_llm(&self) -> Result<Arc<dyn LlmClient>, PipelineError> {
        if let Some(llm) = &self.llm {
            return Ok(llm.clone());
        }
        if self.dry_run {
            tracing::info!("Dry run: using mock LLM");
            return Ok(Arc::new(MockLlmClient::default()));
        }
        let key = config::llm_api_key().ok_or_else(|| {
            PipelineError::Config("GEMINI_API_KEY (or OPENAI_API_KEY) is not set".into())
        })?;
        let llm = &self.config.llm;
        tracing::info!("Using LLM {} at {}", llm.model, llm.base_url);
        Ok(Arc::new(OpenAiClient::new(&llm.base_url, &llm.model, &key)))
    }

    pub fn build_describer(&self) -> Result<Arc<dyn ImageDescriber>, PipelineError> {
        if let Some(describer) = &self.describer {
            return Ok(describer.clone());
        }
        if self.dry_run {
            return Ok(Arc::new(MockDescriber::default()));
        }
        let key = config::llm_api_key().ok_or_else(|| {
            PipelineError::Config("GEMINI_API_KEY (or OPENAI_API_KEY) is not set".into())
        })?;
        let llm = &self.config.llm;
        Ok(Arc::new(OpenAiVisionClient::new(
            &llm.base_url,
            &llm.vision_model,
            &key,
            std::time::Duration::from_secs(llm.request_timeout_secs),
        )?))
    }

    /// 生图客户端：FAL_KEY 必须存在（dry_run 除外）
    pub fn build_generator(&self) -> Result<Arc<dyn ImageGenerator>, PipelineError> {
        if let Some(generator) = &self.generator {
            return Ok(generator.clone());
        }
        if self.dry_run {
            tracing::info!("Dry run: using mock image generator");
            return Ok(Arc::new(MockImageGenerator::new()));
        }
        let key = config::fal_api_key()
            .ok_or_else(|| PipelineError::Config("FAL_KEY is not set".into()))?;
        tracing::info!("Using fal.ai model {}", self.config.generation.model);
        Ok(Arc::new(FalClient::new(key, &self.config.generation)))
    }

    pub fn build_prompt_generator(&self, llm: Arc<dyn LlmClient>) -> PromptGenerator {
        PromptGenerator::new(llm, RetryPolicy::from_config(&self.config.retry))
    }

    pub async fn build_store(&self) -> Result<Arc<SqliteStore>, PipelineError> {
        Ok(Arc::new(SqliteStore::open(&self.config.app.database_path).await?))
    }

    /// 装配完整组件
    pub async fn build(self) -> Result<PipelineComponents, PipelineError> {
        self.config.validate()?;
        let llm = self.build_llm()?;
        let generator = self.build_generator()?;
        let describer = self.build_describer()?;
        let store = self.build_store().await?;
        let retry = RetryPolicy::from_config(&self.config.retry);
        // 重试由 Pipeline 负责，逐次记录调用
        let refiner = Arc::new(LlmPromptRefiner::new(llm.clone(), RetryPolicy::none()));

        let pipeline = Pipeline::new(
            self.config.clone(),
            store.clone(),
            generator,
            describer,
            refiner,
            Arc::new(TaskScheduler::from_config(&self.config)),
            retry,
            self.cancel.clone(),
        )?;

        Ok(PipelineComponents {
            pipeline: Arc::new(pipeline),
            store,
            llm,
            config: self.config,
        })
    }
}

/// 预构建的组件：流水线、存储、文本 LLM
pub struct PipelineComponents {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<SqliteStore>,
    pub llm: Arc<dyn LlmClient>,
    pub config: Arc<AppConfig>,
}

impl PipelineComponents {
    pub fn prompt_generator(&self) -> PromptGenerator {
        PromptGenerator::new(self.llm.clone(), RetryPolicy::from_config(&self.config.retry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &std::path::Path) -> Arc<AppConfig> {
        let mut config = AppConfig::default();
        config.app.database_path = dir.join("db").join("lumen.db");
        config.app.output_dir = dir.join("out");
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_dry_run_builds_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        let components = PipelineBuilder::new(temp_config(dir.path()))
            .dry_run(true)
            .build()
            .await
            .unwrap();
        assert_eq!(components.llm.name(), "mock-llm");
        assert!(components.store.verify().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_thresholds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.app.database_path = dir.path().join("db.sqlite");
        config.pipeline.quality_threshold = 0.9;
        config.pipeline.refinement_threshold = 0.5;
        let result = PipelineBuilder::new(Arc::new(config)).dry_run(true).build().await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let builder = PipelineBuilder::new(Arc::new(AppConfig::default()))
            .with_llm(Arc::new(MockLlmClient::with_reply("x")))
            .with_generator(Arc::new(MockImageGenerator::new()));
        assert_eq!(builder.build_llm().unwrap().name(), "mock-llm");
        assert_eq!(builder.build_generator().unwrap().name(), "mock-image");
    }
}
