//! 产物落盘
//!
//! 目录布局：
//! - `<output>/images/{prompt_id}_iter{n}_v{k}.png`：每个变体一张
//! - `<output>/current/{prompt_id}.png`：最近一次完成迭代的最佳图
//! - `{stem}_description.txt`：单图评估时写在图片旁边

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::PipelineError;
use crate::imaging::GeneratedImage;

/// 图片与描述文件的存放位置
#[derive(Clone)]
pub struct ImageStore {
    output_dir: PathBuf,
    client: reqwest::Client,
}

impl ImageStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            output_dir: output_dir.into(),
            client,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join("images")
    }

    pub fn current_dir(&self) -> PathBuf {
        self.output_dir.join("current")
    }

    /// 变体图片路径；无变体时为 `{prompt_id}_iter{n}.png`
    pub fn variant_path(&self, prompt_id: &str, iteration: u32, variant: Option<usize>) -> PathBuf {
        let file = match variant {
            Some(v) => format!("{prompt_id}_iter{iteration}_v{v}.png"),
            None => format!("{prompt_id}_iter{iteration}.png"),
        };
        self.images_dir().join(file)
    }

    /// 取回图片内容：URL 结果需下载；空内容视为无效响应
    pub async fn fetch(&self, image: &GeneratedImage) -> Result<Vec<u8>, PipelineError> {
        let bytes = match image {
            GeneratedImage::Bytes(bytes) => bytes.clone(),
            GeneratedImage::Url(url) => self.download(url).await?,
        };
        if bytes.is_empty() {
            return Err(PipelineError::InvalidResponse("empty image payload".into()));
        }
        Ok(bytes)
    }

    pub async fn write(&self, bytes: &[u8], path: &Path) -> Result<u64, PipelineError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes.len() as u64)
    }

    /// fetch + write
    pub async fn save(&self, image: &GeneratedImage, path: &Path) -> Result<u64, PipelineError> {
        let bytes = self.fetch(image).await?;
        self.write(&bytes, path).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::from_status(status.as_u16(), body));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// 把最佳图复制为 current/{prompt_id}.png
    pub async fn publish_current(&self, prompt_id: &str, best: &Path) -> Result<PathBuf, PipelineError> {
        let dir = self.current_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let target = dir.join(format!("{prompt_id}.png"));
        tokio::fs::copy(best, &target).await?;
        Ok(target)
    }

    /// 在图片旁写入 `{stem}_description.txt`
    pub async fn write_description(image_path: &Path, text: &str) -> Result<PathBuf, PipelineError> {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("not an image file: {}", image_path.display()))
            })?;
        let target = image_path.with_file_name(format!("{stem}_description.txt"));
        tokio::fs::write(&target, text).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_naming() {
        let store = ImageStore::new("/out");
        assert_eq!(
            store.variant_path("p1", 2, Some(3)),
            PathBuf::from("/out/images/p1_iter2_v3.png")
        );
        assert_eq!(
            store.variant_path("p1", 1, None),
            PathBuf::from("/out/images/p1_iter1.png")
        );
    }

    #[tokio::test]
    async fn test_save_bytes_and_publish() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let path = store.variant_path("cabin", 1, Some(0));
        let written = store
            .save(&GeneratedImage::Bytes(vec![1, 2, 3]), &path)
            .await
            .unwrap();
        assert_eq!(written, 3);

        let current = store.publish_current("cabin", &path).await.unwrap();
        assert_eq!(std::fs::read(current).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_payload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let path = store.variant_path("x", 1, Some(0));
        let err = store
            .save(&GeneratedImage::Bytes(Vec::new()), &path)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidResponse(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_description_written_next_to_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("shot.png");
        std::fs::write(&image, b"x").unwrap();
        let target = ImageStore::write_description(&image, "a red barn").await.unwrap();
        assert_eq!(target, dir.path().join("shot_description.txt"));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "a red barn");
    }
}
