//! LLM 层：文本客户端（提示词生成 / 改写）与视觉客户端（看图描述），OpenAI 兼容实现与 Mock

pub mod message;
pub mod mock;
pub mod openai;
pub mod sanitize;
pub mod traits;
pub mod vision;

pub use message::{Message, Role};
pub use mock::{MockDescriber, MockLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use sanitize::clean_prompt_text;
pub use traits::{ImageDescriber, LlmClient};
pub use vision::OpenAiVisionClient;
