//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `LUMEN__*` 覆盖（双下划线表示嵌套，如 `LUMEN__PIPELINE__MAX_ITERATIONS=5`）。
//! 配置在进程启动时构建一次，之后以 `Arc<AppConfig>` 只读共享，运行期不再修改。
//! 密钥不进配置文件：生图用 `FAL_KEY`，LLM 用 `GEMINI_API_KEY`（缺省回退 `OPENAI_API_KEY`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::PipelineError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// [app] 段：输入文件、输出目录、数据库路径
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_input_file() -> PathBuf {
    PathBuf::from("data/inputs/prompts.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/outputs")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/database/image_generation.db")
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            input_file: default_input_file(),
            output_dir: default_output_dir(),
            database_path: default_database_path(),
        }
    }
}

/// [pipeline] 段：迭代上限、每轮变体数、质量门槛、并发
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// 每轮生成的候选图数量（会被 clamp 到 [min_variants, max_variants]）
    #[serde(default = "default_variants_per_iteration")]
    pub variants_per_iteration: usize,
    #[serde(default = "default_min_variants")]
    pub min_variants: usize,
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,
    /// 变体可用的最低分
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    /// 达到此分数则不再改写提示词
    #[serde(default = "default_refinement_threshold")]
    pub refinement_threshold: f64,
    /// 同时处理的提示词数量
    #[serde(default = "default_max_concurrent_prompts")]
    pub max_concurrent_prompts: usize,
    /// 输入条目未指定 model 时使用
    #[serde(default = "default_model_tag")]
    pub default_model: String,
    /// 是否从 prompt_status 续跑
    #[serde(default = "default_true")]
    pub resume: bool,
    /// 完成后把最佳图复制到 current/{prompt_id}.png
    #[serde(default = "default_true")]
    pub publish_current: bool,
}

fn default_max_iterations() -> u32 {
    3
}

fn default_variants_per_iteration() -> usize {
    5
}

fn default_min_variants() -> usize {
    1
}

fn default_max_variants() -> usize {
    10
}

fn default_quality_threshold() -> f64 {
    0.7
}

fn default_refinement_threshold() -> f64 {
    0.85
}

fn default_max_concurrent_prompts() -> usize {
    3
}

fn default_model_tag() -> String {
    "flux".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            variants_per_iteration: default_variants_per_iteration(),
            min_variants: default_min_variants(),
            max_variants: default_max_variants(),
            quality_threshold: default_quality_threshold(),
            refinement_threshold: default_refinement_threshold(),
            max_concurrent_prompts: default_max_concurrent_prompts(),
            default_model: default_model_tag(),
            resume: true,
            publish_current: true,
        }
    }
}

impl PipelineSection {
    /// 实际使用的变体数：请求值（缺省取配置）落在 [min, max] 区间内
    pub fn variant_count(&self, requested: Option<usize>) -> usize {
        let size = requested.unwrap_or(self.variants_per_iteration);
        let min = self.min_variants.max(1);
        size.clamp(min, self.max_variants.max(min))
    }
}

/// [generation] 段：fal.ai 队列接口与生图参数
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: String,
    #[serde(default = "default_num_inference_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,
    #[serde(default = "default_image_size")]
    pub width: u32,
    #[serde(default = "default_image_size")]
    pub height: u32,
    /// 轮询队列状态的间隔（毫秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 单张图从提交到完成的超时（秒）
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_generation_concurrency")]
    pub max_concurrent: usize,
}

fn default_generation_endpoint() -> String {
    "https://queue.fal.run".to_string()
}

fn default_generation_model() -> String {
    "fal-ai/fast-lightning-sdxl".to_string()
}

fn default_negative_prompt() -> String {
    "blurry, low quality, distorted, deformed, ugly, bad anatomy".to_string()
}

fn default_num_inference_steps() -> u32 {
    30
}

fn default_guidance_scale() -> f64 {
    7.5
}

fn default_image_size() -> u32 {
    1024
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_generation_concurrency() -> usize {
    5
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            negative_prompt: default_negative_prompt(),
            num_inference_steps: default_num_inference_steps(),
            guidance_scale: default_guidance_scale(),
            width: default_image_size(),
            height: default_image_size(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_generation_timeout(),
            max_concurrent: default_generation_concurrency(),
        }
    }
}

/// [llm] 段：OpenAI 兼容端点（默认 Gemini 的兼容层）、文本与视觉模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_model")]
    pub vision_model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 视觉描述与改写各自的并发上限
    #[serde(default = "default_llm_concurrency")]
    pub max_concurrent: usize,
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_llm_concurrency() -> usize {
    3
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            vision_model: default_llm_model(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent: default_llm_concurrency(),
        }
    }
}

/// [retry] 段：瞬时错误的指数退避
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_exponential_base() -> f64 {
    2.0
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            exponential_base: default_exponential_base(),
        }
    }
}

impl AppConfig {
    /// 启动时校验：阈值区间、迭代上限、并发数
    pub fn validate(&self) -> Result<(), PipelineError> {
        let p = &self.pipeline;
        if !(0.0..=1.0).contains(&p.quality_threshold)
            || !(0.0..=1.0).contains(&p.refinement_threshold)
            || p.quality_threshold > p.refinement_threshold
        {
            return Err(PipelineError::Config(format!(
                "thresholds must satisfy 0 <= quality ({}) <= refinement ({}) <= 1",
                p.quality_threshold, p.refinement_threshold
            )));
        }
        if p.max_iterations == 0 {
            return Err(PipelineError::Config("max_iterations must be >= 1".into()));
        }
        if p.max_concurrent_prompts == 0 {
            return Err(PipelineError::Config("max_concurrent_prompts must be >= 1".into()));
        }
        if p.min_variants > p.max_variants {
            return Err(PipelineError::Config(format!(
                "min_variants ({}) exceeds max_variants ({})",
                p.min_variants, p.max_variants
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::Config("retry.max_attempts must be >= 1".into()));
        }
        if self.retry.exponential_base < 1.0 {
            return Err(PipelineError::Config("retry.exponential_base must be >= 1".into()));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 LUMEN__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 LUMEN__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LUMEN")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 生图密钥
pub fn fal_api_key() -> Option<String> {
    std::env::var("FAL_KEY").ok().filter(|k| !k.is_empty())
}

/// LLM 密钥：GEMINI_API_KEY 优先，其次 OPENAI_API_KEY
pub fn llm_api_key() -> Option<String> {
    ["GEMINI_API_KEY", "OPENAI_API_KEY"]
        .into_iter()
        .find_map(|name| std::env::var(name).ok().filter(|k| !k.is_empty()))
}
