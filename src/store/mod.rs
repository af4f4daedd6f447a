//! 持久化层
//!
//! 记录提示词、迭代、变体及其评估、最佳选择、改写后的提示词、每个提示词的进度，以及外部 API 调用。
//! 只追加 / 覆盖，不删除；所有写入按 (prompt_id, iteration[, variant]) 或 prompt_id 做单行 upsert，
//! 因此并发的提示词任务之间无需额外加锁。

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::PipelineError;
use crate::prompts::Prompt;

pub use sqlite::SqliteStore;

/// 当前 schema 版本
pub const SCHEMA_VERSION: &str = "1.0.0";

/// 迭代状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    Pending,
    Generated,
    Evaluated,
    Completed,
    Failed,
}

impl IterationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationStatus::Pending => "pending",
            IterationStatus::Generated => "generated",
            IterationStatus::Evaluated => "evaluated",
            IterationStatus::Completed => "completed",
            IterationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(IterationStatus::Pending),
            "generated" => Some(IterationStatus::Generated),
            "evaluated" => Some(IterationStatus::Evaluated),
            "completed" => Some(IterationStatus::Completed),
            "failed" => Some(IterationStatus::Failed),
            _ => None,
        }
    }
}

/// 提示词整体进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRunStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl PromptRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRunStatus::Pending => "pending",
            PromptRunStatus::InProgress => "in_progress",
            PromptRunStatus::Completed => "completed",
            PromptRunStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PromptRunStatus::Pending),
            "in_progress" => Some(PromptRunStatus::InProgress),
            "completed" => Some(PromptRunStatus::Completed),
            "error" => Some(PromptRunStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for PromptRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (prompt, iteration) 一行
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub prompt_id: String,
    pub iteration: u32,
    /// 本轮最佳图（选出之前为空）
    pub image_path: Option<String>,
    /// 本轮实际使用的提示词
    pub prompt_text: String,
    pub evaluation: Option<String>,
    pub score: Option<f64>,
    pub status: IterationStatus,
}

impl IterationRecord {
    pub fn pending(prompt_id: &str, iteration: u32, prompt_text: &str) -> Self {
        Self {
            prompt_id: prompt_id.to_string(),
            iteration,
            image_path: None,
            prompt_text: prompt_text.to_string(),
            evaluation: None,
            score: None,
            status: IterationStatus::Pending,
        }
    }
}

/// 一张候选图及其评估结果
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// 入库后的行 id（未入库时为 0）
    pub id: i64,
    pub prompt_id: String,
    pub iteration: u32,
    pub variant: usize,
    pub image_path: String,
    pub description: Option<String>,
    pub score: Option<f64>,
    pub passed: bool,
    pub needs_refinement: bool,
    pub feedback: Option<String>,
}

impl VariantRecord {
    pub fn generated(prompt_id: &str, iteration: u32, variant: usize, image_path: &str) -> Self {
        Self {
            id: 0,
            prompt_id: prompt_id.to_string(),
            iteration,
            variant,
            image_path: image_path.to_string(),
            description: None,
            score: None,
            passed: false,
            needs_refinement: true,
            feedback: None,
        }
    }

    /// 未评估的变体按 0 分处理
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// 每个 (prompt, iteration) 的最佳变体
#[derive(Debug, Clone, PartialEq)]
pub struct BestSelection {
    pub prompt_id: String,
    pub iteration: u32,
    pub variant_id: i64,
    pub variant: usize,
    pub image_path: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinedPromptRecord {
    pub prompt_id: String,
    /// 产生这条改写时所在的迭代
    pub iteration: u32,
    pub refined_text: String,
    pub evaluation_text: String,
    pub needs_refinement: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptStatusRecord {
    pub prompt_id: String,
    pub current_iteration: u32,
    pub status: PromptRunStatus,
    pub updated_at: String,
}

/// 外部 API 调用记录
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub api_name: String,
    pub endpoint: String,
    pub status: String,
    pub error: Option<String>,
}

impl ApiCall {
    pub fn success(api_name: &str, endpoint: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
            endpoint: endpoint.to_string(),
            status: "success".to_string(),
            error: None,
        }
    }

    pub fn failure(api_name: &str, endpoint: &str, error: &PipelineError) -> Self {
        Self {
            api_name: api_name.to_string(),
            endpoint: endpoint.to_string(),
            status: "error".to_string(),
            error: Some(error.to_string()),
        }
    }
}

/// 流水线持久化接口
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn upsert_prompt(&self, prompt: &Prompt) -> Result<(), PipelineError>;
    async fn get_prompt(&self, prompt_id: &str) -> Result<Option<Prompt>, PipelineError>;
    async fn list_prompts(&self) -> Result<Vec<Prompt>, PipelineError>;

    /// 同一 (prompt, iteration) 重复写入时覆盖
    async fn save_iteration(&self, record: &IterationRecord) -> Result<(), PipelineError>;
    async fn get_iteration(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Option<IterationRecord>, PipelineError>;
    async fn list_iterations(&self, prompt_id: &str) -> Result<Vec<IterationRecord>, PipelineError>;

    /// 写入变体行，返回行 id；同一 (prompt, iteration, variant) 覆盖并清空旧评估
    async fn save_variant(&self, record: &VariantRecord) -> Result<i64, PipelineError>;
    async fn update_variant_evaluation(&self, record: &VariantRecord) -> Result<(), PipelineError>;
    async fn list_variants(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Vec<VariantRecord>, PipelineError>;
    /// 清掉某一轮的变体与最佳选择，重跑该轮前调用
    async fn reset_iteration(&self, prompt_id: &str, iteration: u32) -> Result<(), PipelineError>;

    async fn save_best_selection(&self, selection: &BestSelection) -> Result<(), PipelineError>;
    async fn get_best_selection(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Option<BestSelection>, PipelineError>;

    async fn save_refined_prompt(&self, record: &RefinedPromptRecord) -> Result<(), PipelineError>;
    async fn get_refined_prompt(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Option<RefinedPromptRecord>, PipelineError>;

    async fn set_prompt_status(
        &self,
        prompt_id: &str,
        current_iteration: u32,
        status: PromptRunStatus,
    ) -> Result<(), PipelineError>;
    async fn get_prompt_status(
        &self,
        prompt_id: &str,
    ) -> Result<Option<PromptStatusRecord>, PipelineError>;
    async fn list_prompt_statuses(&self) -> Result<Vec<PromptStatusRecord>, PipelineError>;

    async fn record_api_call(&self, call: &ApiCall) -> Result<(), PipelineError>;
    /// api_name 为 None 时统计全部
    async fn count_api_calls(&self, api_name: Option<&str>) -> Result<u64, PipelineError>;
}
