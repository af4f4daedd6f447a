//! fal.ai 队列接口客户端
//!
//! 1. POST {endpoint}/{model} 提交任务，拿到 status_url / response_url
//! 2. 轮询 status_url 直到 COMPLETED（排队 / 进行中的日志以 debug 级别输出）
//! 3. GET response_url 取结果，返回第一张图的 URL
//!
//! 整个过程受 timeout 约束，超时归为可重试错误。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

use crate::config::GenerationSection;
use crate::core::PipelineError;
use crate::imaging::{GeneratedImage, GenerationRequest, ImageGenerator};

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default)]
    logs: Option<Vec<QueueLog>>,
}

#[derive(Debug, Deserialize)]
struct QueueLog {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    #[serde(default)]
    images: Vec<ResultImage>,
}

#[derive(Debug, Deserialize)]
struct ResultImage {
    url: Option<String>,
}

/// fal.ai 客户端
#[derive(Clone)]
pub struct FalClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl FalClient {
    pub fn new(api_key: impl Into<String>, section: &GenerationSection) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: section.endpoint.trim_end_matches('/').to_string(),
            model: section.model.clone(),
            poll_interval: Duration::from_millis(section.poll_interval_ms.max(50)),
            timeout: Duration::from_secs(section.timeout_secs.max(1)),
        }
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    /// 非 2xx 响应按状态码归类
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PipelineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PipelineError::from_status(status.as_u16(), body))
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<QueueSubmission, PipelineError> {
        let body = json!({
            "prompt": request.prompt_text,
            "negative_prompt": request.negative_prompt,
            "num_inference_steps": request.num_inference_steps,
            "guidance_scale": request.guidance_scale,
            "image_size": { "width": request.width, "height": request.height },
            "num_images": 1,
        });

        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, self.model))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn wait_for_completion(&self, submission: &QueueSubmission) -> Result<(), PipelineError> {
        loop {
            let response = self
                .client
                .get(format!("{}?logs=1", submission.status_url))
                .header("Authorization", self.auth_header())
                .send()
                .await?;
            let status: QueueStatus = Self::check(response).await?.json().await?;

            for log in status.logs.iter().flatten() {
                tracing::debug!("[{}] {}", submission.request_id, log.message);
            }

            match status.status.as_str() {
                "COMPLETED" => return Ok(()),
                "IN_QUEUE" => {
                    tracing::debug!(
                        "[{}] queued at position {:?}",
                        submission.request_id,
                        status.queue_position
                    );
                }
                "IN_PROGRESS" => {}
                other => {
                    return Err(PipelineError::InvalidResponse(format!(
                        "unexpected queue status '{other}' for {}",
                        submission.request_id
                    )))
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(&self, submission: &QueueSubmission) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(&submission.response_url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let result: GenerationResult = Self::check(response).await?.json().await?;
        first_image_url(result)
    }
}

fn first_image_url(result: GenerationResult) -> Result<String, PipelineError> {
    result
        .images
        .into_iter()
        .next()
        .and_then(|img| img.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| PipelineError::InvalidResponse("no image in generation result".into()))
}

#[async_trait]
impl ImageGenerator for FalClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, PipelineError> {
        let job = async {
            let submission = self.submit(request).await?;
            tracing::debug!("Submitted generation job {}", submission.request_id);
            self.wait_for_completion(&submission).await?;
            let url = self.fetch_result(&submission).await?;
            tracing::info!("Generation job {} completed", submission.request_id);
            Ok::<_, PipelineError>(GeneratedImage::Url(url))
        };

        match tokio::time::timeout(self.timeout, job).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout(format!(
                "generation did not finish within {:?}",
                self.timeout
            ))),
        }
    }
}
