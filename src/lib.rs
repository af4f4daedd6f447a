//! Lumen - 迭代式文生图流水线
//!
//! LLM 写提示词 → fal.ai 生图 → 视觉模型描述 → 打分选优 → 改写提示词，循环到满意或达到迭代上限，
//! 全部进度写入 SQLite，可中断后续跑。
//!
//! 模块划分：
//! - **cli**: 命令行参数、子命令与交互菜单
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、重试、优雅关闭、协作方限流、组件装配
//! - **imaging**: 生图客户端（fal.ai / Mock）与图片落盘
//! - **llm**: 文本与视觉 LLM 客户端（OpenAI 兼容 / Mock）
//! - **observability**: tracing 日志初始化
//! - **pipeline**: 评分、选优、提示词状态机、改写与批量执行
//! - **prompts**: 提示词文件加载与缺失提示词生成
//! - **store**: 流水线持久化（SQLite）

pub mod cli;
pub mod config;
pub mod core;
pub mod imaging;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod prompts;
pub mod store;

pub use crate::config::{load_config, AppConfig};
pub use crate::core::{PipelineBuilder, PipelineError};
pub use crate::pipeline::{Pipeline, PromptOutcome, RunSummary};
