//! 核心层：错误、重试、关闭、协作方限流、组件装配

pub mod builder;
pub mod error;
pub mod retry;
pub mod shutdown;
pub mod task_scheduler;

pub use builder::{PipelineBuilder, PipelineComponents};
pub use error::PipelineError;
pub use retry::RetryPolicy;
pub use shutdown::{ShutdownCoordinator, ShutdownManager, ShutdownReason, StoreCleanup};
pub use task_scheduler::{TaskKind, TaskScheduler};
