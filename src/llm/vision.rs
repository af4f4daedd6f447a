//! 视觉描述客户端
//!
//! 把本地图片编码为 data URL，通过 OpenAI 兼容的 /chat/completions 接口请求视觉模型给出客观描述。
//! 描述只负责「看到了什么」，打分由 pipeline::grader 完成。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::core::PipelineError;
use crate::llm::ImageDescriber;

const DESCRIBE_INSTRUCTION: &str = "Describe this image in detail, focusing on:\n\
    - Main subjects and their characteristics\n\
    - Composition and layout\n\
    - Colors and lighting\n\
    - Style and artistic elements\n\
    - Notable details or unique features\n\n\
    Provide a clear, objective description without interpretation or judgment.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI 兼容视觉客户端
pub struct OpenAiVisionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVisionClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

/// 根据扩展名推断 MIME 类型
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[async_trait]
impl ImageDescriber for OpenAiVisionClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn describe(&self, image_path: &Path) -> Result<String, PipelineError> {
        let image_data = tokio::fs::read(image_path).await?;
        if image_data.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "image file is empty: {}",
                image_path.display()
            )));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image_data);
        let data_url = format!("data:{};base64,{}", content_type_for(image_path), encoded);

        tracing::debug!(
            "Describing {} ({} bytes) with {}",
            image_path.display(),
            image_data.len(),
            self.model
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": DESCRIBE_INSTRUCTION },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "max_tokens": 1024,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::from_status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response.json().await?;
        let description = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if description.is_empty() {
            return Err(PipelineError::InvalidResponse(
                "vision model returned no description".into(),
            ));
        }
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("noext")), "image/png");
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected_before_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();
        let client =
            OpenAiVisionClient::new("http://127.0.0.1:9", "m", "k", Duration::from_secs(1)).unwrap();
        let err = client.describe(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
