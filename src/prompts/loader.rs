//! 输入批次解析
//!
//! 格式：`{ "model"?: "...", "prompts": [ {id, title, scene, mood, prompt, model?} ] }`。
//! 单条不合法（缺字段、空白、id 重复或不能用作文件名）只拒绝该条，其余照常进入流水线。
//! id 会拼进图片文件名，只允许 ASCII 字母数字与 `-` `_` `.`，且不能以 `.` 开头。

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::core::PipelineError;
use crate::prompts::Prompt;

#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    model: Option<String>,
    prompts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    id: Option<String>,
    title: Option<String>,
    scene: Option<String>,
    #[serde(default)]
    mood: Option<String>,
    prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// 被拒绝的条目
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedPrompt {
    /// 在 prompts 数组中的位置
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptBatch {
    pub prompts: Vec<Prompt>,
    pub rejected: Vec<RejectedPrompt>,
    /// 文件级 model（若有）或配置默认值
    pub default_model: String,
}

fn non_blank(field: &str, value: Option<String>) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(format!("field '{field}' is blank")),
        None => Err(format!("missing field '{field}'")),
    }
}

fn file_safe_id(value: Option<String>) -> Result<String, String> {
    let id = non_blank("id", value)?;
    let allowed = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !allowed || id.starts_with('.') {
        return Err(format!("id '{id}' is not a valid file name"));
    }
    Ok(id)
}

fn validate(raw: RawPrompt, default_model: &str) -> Result<Prompt, String> {
    Ok(Prompt {
        id: file_safe_id(raw.id)?,
        title: non_blank("title", raw.title)?,
        scene: non_blank("scene", raw.scene)?,
        mood: raw.mood.unwrap_or_default().trim().to_string(),
        prompt: non_blank("prompt", raw.prompt)?,
        model: raw
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string()),
    })
}

/// 解析 JSON 文本；文档本身不合法时报错，单条不合法则记入 rejected
pub fn parse_batch(json: &str, default_model: &str) -> Result<PromptBatch, PipelineError> {
    let file: BatchFile = serde_json::from_str(json)?;
    let default_model = file
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| default_model.to_string());

    let mut batch = PromptBatch {
        default_model,
        ..PromptBatch::default()
    };
    let mut seen = HashSet::new();

    for (index, value) in file.prompts.into_iter().enumerate() {
        let raw: RawPrompt = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                batch.rejected.push(RejectedPrompt {
                    index,
                    id: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let id = raw.id.clone();
        match validate(raw, &batch.default_model) {
            Ok(prompt) if !seen.insert(prompt.id.clone()) => {
                batch.rejected.push(RejectedPrompt {
                    index,
                    id: Some(prompt.id),
                    reason: "duplicate id".into(),
                });
            }
            Ok(prompt) => batch.prompts.push(prompt),
            Err(reason) => batch.rejected.push(RejectedPrompt { index, id, reason }),
        }
    }

    for r in &batch.rejected {
        tracing::warn!(
            "Rejected prompt #{} ({}): {}",
            r.index,
            r.id.as_deref().unwrap_or("no id"),
            r.reason
        );
    }
    Ok(batch)
}

pub async fn load_batch(path: &Path, default_model: &str) -> Result<PromptBatch, PipelineError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        PipelineError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    let batch = parse_batch(&content, default_model)?;
    tracing::info!(
        "Loaded {} prompts from {} ({} rejected)",
        batch.prompts.len(),
        path.display(),
        batch.rejected.len()
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_entries_pass_and_model_defaults() {
        let json = r#"{"prompts":[
            {"id":"a","title":"A","scene":"s","mood":"m","prompt":"p"},
            {"id":"b","title":"B","scene":"s","mood":"m","prompt":"p","model":"sdxl"}
        ]}"#;
        let batch = parse_batch(json, "flux").unwrap();
        assert_eq!(batch.prompts.len(), 2);
        assert_eq!(batch.prompts[0].model, "flux");
        assert_eq!(batch.prompts[1].model, "sdxl");
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn test_file_level_model_overrides_default() {
        let json = r#"{"model":"sdxl","prompts":[
            {"id":"a","title":"A","scene":"s","mood":"m","prompt":"p"}
        ]}"#;
        let batch = parse_batch(json, "flux").unwrap();
        assert_eq!(batch.default_model, "sdxl");
        assert_eq!(batch.prompts[0].model, "sdxl");
    }

    #[test]
    fn test_invalid_entries_rejected_rest_kept() {
        let json = r#"{"prompts":[
            {"id":"a","title":"A","scene":"s","mood":"m","prompt":"p"},
            {"id":"b","title":"B","scene":"s","mood":"m","prompt":"   "},
            {"title":"C","scene":"s","prompt":"p"},
            {"id":"a","title":"dup","scene":"s","prompt":"p"},
            "not an object"
        ]}"#;
        let batch = parse_batch(json, "flux").unwrap();
        assert_eq!(batch.prompts.len(), 1);
        assert_eq!(batch.rejected.len(), 4);
        assert_eq!(batch.rejected[0].id.as_deref(), Some("b"));
        assert!(batch.rejected[1].reason.contains("id"));
        assert_eq!(batch.rejected[2].reason, "duplicate id");
    }

    #[test]
    fn test_ids_that_escape_output_dir_rejected() {
        let json = r#"{"prompts":[
            {"id":"../../etc/x","title":"A","scene":"s","prompt":"p"},
            {"id":"a/b","title":"A","scene":"s","prompt":"p"},
            {"id":"a\\b","title":"A","scene":"s","prompt":"p"},
            {"id":"..","title":"A","scene":"s","prompt":"p"},
            {"id":"snowy cabin","title":"A","scene":"s","prompt":"p"},
            {"id":"snowy_cabin-2.v1","title":"A","scene":"s","prompt":"p"}
        ]}"#;
        let batch = parse_batch(json, "flux").unwrap();
        assert_eq!(batch.prompts.len(), 1);
        assert_eq!(batch.prompts[0].id, "snowy_cabin-2.v1");
        assert_eq!(batch.rejected.len(), 5);
        assert!(batch
            .rejected
            .iter()
            .all(|r| r.reason.contains("not a valid file name")));
        assert_eq!(batch.rejected[1].id.as_deref(), Some("a/b"));
    }

    #[test]
    fn test_missing_prompts_key_is_error() {
        assert!(parse_batch(r#"{"items":[]}"#, "flux").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_invalid_input() {
        let err = load_batch(Path::new("/nonexistent/prompts.json"), "flux")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
