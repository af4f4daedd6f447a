//! LLM 输出清洗：去掉代码块围栏、"Prompt:" 之类标签与首尾引号

use std::sync::OnceLock;

use regex::Regex;

static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static LABEL_RE: OnceLock<Regex> = OnceLock::new();

/// 清洗模型回复，只留下提示词正文；可能返回空串，由调用方判定
pub fn clean_prompt_text(raw: &str) -> String {
    let fence = FENCE_RE.get_or_init(|| Regex::new(r"(?m)^```[a-zA-Z]*\s*$").expect("valid regex"));
    let label = LABEL_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(refined\s+prompt|revised\s+prompt|improved\s+prompt|prompt)\s*:\s*")
            .expect("valid regex")
    });

    let without_fences = fence.replace_all(raw, "");
    let trimmed = without_fences.trim();
    let without_label = label.replace(trimmed, "");
    without_label
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
        .to_string()
}
