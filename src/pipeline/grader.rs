//! 描述评分
//!
//! 把视觉模型给出的描述与原始提示词比较：
//! - 两段文本都转小写、按空白切分得到词集合；标点不剥离，`dusk,` 与 `dusk` 是两个词
//! - overlap = |P ∩ D| / |P|，P 为空直接报 InvalidInput
//! - length_factor = min(描述词数 / 50, 1)
//! - score = clamp(0.7 * overlap + 0.3 * length_factor, 0, 1)
//!
//! `grade` 永不失败：内部错误折算为 0 分、未通过、需要改写。

use std::collections::HashSet;

use serde::Serialize;

use crate::core::PipelineError;

const OVERLAP_WEIGHT: f64 = 0.7;
const LENGTH_WEIGHT: f64 = 0.3;
/// 描述达到这个词数时长度分满分
const FULL_LENGTH_WORDS: f64 = 50.0;

/// 反馈档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedbackTier {
    Full,
    Basic,
    Inadequate,
}

impl FeedbackTier {
    pub fn message(&self) -> &'static str {
        match self {
            FeedbackTier::Full => "The image meets the requirements fully.",
            FeedbackTier::Basic => {
                "The image meets basic requirements but could be improved."
            }
            FeedbackTier::Inadequate => "The image does not adequately match the requirements.",
        }
    }
}

/// 一次评分结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub score: f64,
    pub passed: bool,
    pub needs_refinement: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Grader {
    quality_threshold: f64,
    refinement_threshold: f64,
}

impl Default for Grader {
    fn default() -> Self {
        Self {
            quality_threshold: 0.7,
            refinement_threshold: 0.85,
        }
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

impl Grader {
    /// 阈值须满足 0 <= quality <= refinement <= 1
    pub fn new(quality_threshold: f64, refinement_threshold: f64) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&quality_threshold)
            || !(0.0..=1.0).contains(&refinement_threshold)
            || quality_threshold > refinement_threshold
        {
            return Err(PipelineError::InvalidInput(format!(
                "invalid thresholds: quality {quality_threshold}, refinement {refinement_threshold}"
            )));
        }
        Ok(Self {
            quality_threshold,
            refinement_threshold,
        })
    }

    pub fn quality_threshold(&self) -> f64 {
        self.quality_threshold
    }

    pub fn refinement_threshold(&self) -> f64 {
        self.refinement_threshold
    }

    pub fn tier(&self, score: f64) -> FeedbackTier {
        if score >= self.refinement_threshold {
            FeedbackTier::Full
        } else if score >= self.quality_threshold {
            FeedbackTier::Basic
        } else {
            FeedbackTier::Inadequate
        }
    }

    /// 计算分数；提示词没有任何词时返回 InvalidInput
    pub fn score(&self, description: &str, original_prompt: &str) -> Result<f64, PipelineError> {
        let prompt_words = word_set(original_prompt);
        if prompt_words.is_empty() {
            return Err(PipelineError::InvalidInput(
                "original prompt has no words to compare against".into(),
            ));
        }
        let description_words = word_set(description);
        let common = prompt_words.intersection(&description_words).count();
        let overlap = common as f64 / prompt_words.len() as f64;

        let word_count = description.split_whitespace().count() as f64;
        let length_factor = (word_count / FULL_LENGTH_WORDS).min(1.0);

        let score = overlap * OVERLAP_WEIGHT + length_factor * LENGTH_WEIGHT;
        Ok(score.clamp(0.0, 1.0))
    }

    pub fn try_grade(
        &self,
        description: &str,
        original_prompt: &str,
    ) -> Result<Evaluation, PipelineError> {
        let score = self.score(description, original_prompt)?;
        Ok(Evaluation {
            score,
            passed: score >= self.quality_threshold,
            needs_refinement: score < self.refinement_threshold,
            feedback: self.tier(score).message().to_string(),
        })
    }

    pub fn grade(&self, description: &str, original_prompt: &str) -> Evaluation {
        match self.try_grade(description, original_prompt) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::warn!("Grading failed: {}", e);
                Evaluation {
                    score: 0.0,
                    passed: false,
                    needs_refinement: true,
                    feedback: format!("Error during evaluation: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CABIN_PROMPT: &str = "cozy cabin in snowy forest";
    const CABIN_DESCRIPTION: &str = "A small wooden cabin sits in a snowy forest clearing, smoke rising \
        from its chimney, with tall pine trees covered in fresh snow surrounding it under a pale \
        winter sky, warm light glowing from the windows.";

    #[test]
    fn test_full_overlap_long_description_scores_one() {
        let grader = Grader::default();
        let prompt = "red barn";
        let description = format!("red barn {}", "word ".repeat(60));
        let eval = grader.grade(&description, prompt);
        assert!((eval.score - 1.0).abs() < 1e-9);
        assert!(eval.passed);
        assert!(!eval.needs_refinement);
        assert_eq!(eval.feedback, FeedbackTier::Full.message());
    }

    #[test]
    fn test_no_overlap_caps_at_length_weight() {
        let grader = Grader::default();
        let description = "word ".repeat(80);
        let eval = grader.grade(&description, "violet submarine");
        assert!(eval.score <= 0.3 + 1e-9);
        assert!(!eval.passed);
        assert!(eval.needs_refinement);
    }

    #[test]
    fn test_cabin_example() {
        let grader = Grader::default();
        let eval = grader.grade(CABIN_DESCRIPTION, CABIN_PROMPT);
        // cabin, in, snowy, forest 命中 4/5，描述 36 个词
        let expected = 0.7 * 0.8 + 0.3 * (36.0 / 50.0);
        assert!((eval.score - expected).abs() < 1e-9, "score = {}", eval.score);
        assert!(eval.passed);
        assert!(eval.needs_refinement);
        assert_eq!(eval.feedback, FeedbackTier::Basic.message());
    }

    #[test]
    fn test_short_matching_description() {
        let grader = Grader::default();
        let eval = grader.grade(
            "a snowy cabin glowing at dusk with warm light and calm air",
            "a snowy cabin glowing at dusk",
        );
        assert!((eval.score - (0.7 + 0.3 * 12.0 / 50.0)).abs() < 1e-9);
        assert!(eval.passed);
        assert!(eval.needs_refinement);
    }

    #[test]
    fn test_trailing_punctuation_breaks_match() {
        let grader = Grader::default();
        let eval = grader.grade(
            "a snowy cabin glowing at dusk, warm light, calm",
            "a snowy cabin glowing at dusk",
        );
        // "dusk," 不算命中：5/6，9 个词
        let expected = 0.7 * (5.0 / 6.0) + 0.3 * (9.0 / 50.0);
        assert!((eval.score - expected).abs() < 1e-9, "score = {}", eval.score);
        assert!(!eval.passed);
        assert!(eval.needs_refinement);
        assert_eq!(eval.feedback, FeedbackTier::Inadequate.message());
    }

    #[test]
    fn test_case_ignored_punctuation_kept() {
        let grader = Grader::default();
        let plain = grader.score("forest cabin", "cabin forest").unwrap();
        assert_eq!(grader.score("Forest CABIN", "cabin forest").unwrap(), plain);
        assert!(grader.score("Forest, CABIN!", "cabin forest").unwrap() < plain);
    }

    #[test]
    fn test_empty_prompt_is_invalid_input() {
        let grader = Grader::default();
        let err = grader.try_grade("anything", " \t\n ").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let eval = grader.grade("anything", "");
        assert_eq!(eval.score, 0.0);
        assert!(!eval.passed);
        assert!(eval.needs_refinement);
        assert!(eval.feedback.starts_with("Error"));
    }

    #[test]
    fn test_deterministic_and_in_range() {
        let grader = Grader::default();
        let samples = [
            ("", "a b c"),
            ("a", "a"),
            ("b c d e f g", "a b"),
            ("the the the the", "the"),
        ];
        for (d, p) in samples {
            let first = grader.grade(d, p);
            let second = grader.grade(d, p);
            assert_eq!(first, second);
            assert!((0.0..=1.0).contains(&first.score));
            assert!(!first.score.is_nan());
        }
    }

    #[test]
    fn test_thresholds_validated() {
        assert!(Grader::new(0.9, 0.8).is_err());
        assert!(Grader::new(-0.1, 0.8).is_err());
        assert!(Grader::new(0.5, 1.1).is_err());
        let g = Grader::new(0.5, 0.5).unwrap();
        assert_eq!(g.tier(0.5), FeedbackTier::Full);
    }
}
