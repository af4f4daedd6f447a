//! 迭代流水线：评分、选优、状态机、改写与执行

pub mod grader;
pub mod refiner;
pub mod runner;
pub mod selector;
pub mod state;

pub use grader::{Evaluation, FeedbackTier, Grader};
pub use refiner::{LlmPromptRefiner, PromptRefiner};
pub use runner::{DirectoryEvaluation, Pipeline, RunSummary};
pub use selector::BestVariantSelector;
pub use state::{CompletionReason, PromptOutcome, PromptPhase, PromptState};
