//! 任务调度：按协作方分池限流
//!
//! 生图 / 视觉描述 / 提示词改写各有一个 Semaphore，与提示词级别的批并发相互独立，
//! 用来遵守第三方接口的速率限制。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::AppConfig;
use crate::core::PipelineError;

/// 任务类型
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TaskKind {
    /// 文生图
    Generation,
    /// 视觉描述
    Vision,
    /// 提示词改写 / 生成
    Refinement,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Generation => "generation",
            TaskKind::Vision => "vision",
            TaskKind::Refinement => "refinement",
        }
    }
}

/// 任务调度器
#[derive(Debug)]
pub struct TaskScheduler {
    generation: Arc<Semaphore>,
    vision: Arc<Semaphore>,
    refinement: Arc<Semaphore>,
}

impl TaskScheduler {
    pub fn new(max_generation: usize, max_vision: usize, max_refinement: usize) -> Self {
        Self {
            generation: Arc::new(Semaphore::new(max_generation.max(1))),
            vision: Arc::new(Semaphore::new(max_vision.max(1))),
            refinement: Arc::new(Semaphore::new(max_refinement.max(1))),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.generation.max_concurrent,
            config.llm.max_concurrent,
            config.llm.max_concurrent,
        )
    }

    fn semaphore(&self, kind: TaskKind) -> &Arc<Semaphore> {
        match kind {
            TaskKind::Generation => &self.generation,
            TaskKind::Vision => &self.vision,
            TaskKind::Refinement => &self.refinement,
        }
    }

    /// 获取某类协作方的调用许可
    pub async fn acquire(&self, kind: TaskKind) -> Result<OwnedSemaphorePermit, PipelineError> {
        let semaphore = self.semaphore(kind);
        if semaphore.available_permits() == 0 {
            tracing::debug!("Waiting for a {} slot", kind.as_str());
        }
        semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Cancelled)
    }

    /// 当前可用许可数
    pub fn available(&self, kind: TaskKind) -> usize {
        self.semaphore(kind).available_permits()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(5, 3, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pools_are_independent() {
        let scheduler = TaskScheduler::new(1, 2, 1);
        let _gen = scheduler.acquire(TaskKind::Generation).await.unwrap();
        assert_eq!(scheduler.available(TaskKind::Generation), 0);
        assert_eq!(scheduler.available(TaskKind::Vision), 2);
        let _v = scheduler.acquire(TaskKind::Vision).await.unwrap();
        assert_eq!(scheduler.available(TaskKind::Vision), 1);
    }
}
