//! 提示词：输入批次的解析与校验，以及为缺少 prompt 的场景调用 LLM 生成

pub mod generator;
pub mod loader;

use serde::{Deserialize, Serialize};

pub use generator::{GenerationStats, PromptGenerator};
pub use loader::{load_batch, parse_batch, PromptBatch, RejectedPrompt};

/// 一条已校验的提示词；`prompt` 为原文，之后的改写只作为工作文本，不覆盖它
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub scene: String,
    #[serde(default)]
    pub mood: String,
    pub prompt: String,
    pub model: String,
}

impl Prompt {
    /// 发给生图接口的完整文本；working 为本轮工作提示词（首轮即原文）
    pub fn generation_text(&self, working: &str) -> String {
        format!(
            "Title: {}\nScene: {}\nMood: {}\nPrompt: {}",
            self.title, self.scene, self.mood, working
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_text_uses_working_prompt() {
        let p = Prompt {
            id: "a".into(),
            title: "Harbor".into(),
            scene: "Boats at dawn".into(),
            mood: "quiet".into(),
            prompt: "original".into(),
            model: "flux".into(),
        };
        let text = p.generation_text("refined boats");
        assert!(text.starts_with("Title: Harbor\n"));
        assert!(text.ends_with("Prompt: refined boats"));
        assert!(!text.contains("original"));
    }
}
