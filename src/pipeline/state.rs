//! 单个提示词的迭代状态机
//!
//! `Pending → Generating → Evaluating → Grading → {Refining → Generating} | Completed | Failed`
//!
//! Completed / Failed 在一次运行中是终态；下一次运行可按 prompt_status 续跑。

use serde::Serialize;

use crate::core::PipelineError;

/// 阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PromptPhase {
    Pending,
    Generating,
    Evaluating,
    Grading,
    Refining,
    Completed,
    Failed,
}

impl PromptPhase {
    pub fn can_transition_to(self, next: PromptPhase) -> bool {
        use PromptPhase::*;
        matches!(
            (self, next),
            (Pending, Generating)
                | (Generating, Evaluating)
                | (Evaluating, Grading)
                | (Grading, Refining)
                | (Grading, Completed)
                | (Refining, Generating)
        ) || (!self.is_terminal() && next == Failed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PromptPhase::Completed | PromptPhase::Failed)
    }
}

/// 运行中的状态：阶段、迭代号、本轮工作提示词
#[derive(Debug, Clone)]
pub struct PromptState {
    pub prompt_id: String,
    pub phase: PromptPhase,
    /// 当前迭代（从 1 开始；0 表示尚未开始）
    pub iteration: u32,
    pub working_text: String,
}

impl PromptState {
    pub fn new(prompt_id: &str, working_text: &str) -> Self {
        Self {
            prompt_id: prompt_id.to_string(),
            phase: PromptPhase::Pending,
            iteration: 0,
            working_text: working_text.to_string(),
        }
    }

    /// 非法转移属于调用方的编程错误
    pub fn transition(&mut self, next: PromptPhase) -> Result<(), PipelineError> {
        if !self.phase.can_transition_to(next) {
            return Err(PipelineError::InvalidInput(format!(
                "illegal transition {:?} -> {:?} for {}",
                self.phase, next, self.prompt_id
            )));
        }
        tracing::debug!(
            prompt_id = %self.prompt_id,
            iteration = self.iteration,
            "{:?} -> {:?}",
            self.phase,
            next
        );
        if next == PromptPhase::Generating {
            self.iteration += 1;
        }
        self.phase = next;
        Ok(())
    }
}

/// 正常完成的原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CompletionReason {
    /// 最佳变体无需继续改写
    Satisfied,
    /// 达到迭代上限
    IterationCap,
}

/// 一个提示词在本次运行中的结局
#[derive(Clone, Debug, PartialEq)]
pub enum PromptOutcome {
    Completed {
        iterations: u32,
        best_score: f64,
        reason: CompletionReason,
    },
    /// 没有变体过质量线，循环停止但不算协作方失败
    SoftFailed { iteration: u32 },
    Failed { iteration: u32, error: String },
    Cancelled { iteration: u32 },
    /// 已完成，续跑时跳过
    Skipped,
}

impl PromptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PromptOutcome::Completed { .. } => "completed",
            PromptOutcome::SoftFailed { .. } => "soft-failed",
            PromptOutcome::Failed { .. } => "failed",
            PromptOutcome::Cancelled { .. } => "cancelled",
            PromptOutcome::Skipped => "skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = PromptState::new("p", "text");
        for phase in [
            PromptPhase::Generating,
            PromptPhase::Evaluating,
            PromptPhase::Grading,
            PromptPhase::Refining,
            PromptPhase::Generating,
            PromptPhase::Evaluating,
            PromptPhase::Grading,
            PromptPhase::Completed,
        ] {
            state.transition(phase).unwrap();
        }
        assert_eq!(state.iteration, 2);
        assert!(state.phase.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_sinks() {
        assert!(!PromptPhase::Completed.can_transition_to(PromptPhase::Generating));
        assert!(!PromptPhase::Failed.can_transition_to(PromptPhase::Failed));
        assert!(PromptPhase::Evaluating.can_transition_to(PromptPhase::Failed));
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut state = PromptState::new("p", "text");
        assert!(state.transition(PromptPhase::Grading).is_err());
        assert_eq!(state.phase, PromptPhase::Pending);
    }
}
