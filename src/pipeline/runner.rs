//! 流水线执行
//!
//! 批次内的提示词按 max_concurrent_prompts 并发，单个提示词的迭代严格串行：
//! 生成变体 → 逐个描述 → 评分 → 选出最佳 → 改写或停止。
//! 每一步都先落盘再进入下一步（图片 → 变体行 → 评估 → 选择），取消只在提示词之间与迭代之间生效，
//! 因此不会留下写了一半的迭代。
//!
//! 协作方失败只让当前提示词进入 Failed，批次中的其他提示词照常执行。

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::{PipelineError, RetryPolicy, TaskKind, TaskScheduler};
use crate::imaging::{GenerationRequest, ImageGenerator, ImageStore};
use crate::llm::ImageDescriber;
use crate::pipeline::grader::{Evaluation, Grader};
use crate::pipeline::refiner::PromptRefiner;
use crate::pipeline::selector::BestVariantSelector;
use crate::pipeline::state::{CompletionReason, PromptOutcome, PromptPhase, PromptState};
use crate::prompts::Prompt;
use crate::store::{
    ApiCall, BestSelection, IterationRecord, IterationStatus, PipelineStore, PromptRunStatus,
    RefinedPromptRecord, VariantRecord,
};

/// 一次批量运行的汇总
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, PromptOutcome)>,
}

impl RunSummary {
    fn count(&self, label: &str) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.label() == label).count()
    }

    pub fn completed(&self) -> usize {
        self.count("completed")
    }

    pub fn soft_failed(&self) -> usize {
        self.count("soft-failed")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    pub fn cancelled(&self) -> usize {
        self.count("cancelled")
    }

    pub fn outcome(&self, prompt_id: &str) -> Option<&PromptOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == prompt_id)
            .map(|(_, o)| o)
    }

    /// 没有协作方失败
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} prompts: {} completed, {} soft-failed, {} failed, {} skipped, {} cancelled",
            self.outcomes.len(),
            self.completed(),
            self.soft_failed(),
            self.failed(),
            self.skipped(),
            self.cancelled()
        )
    }
}

/// 对一个目录内图片的评估结果（不落库）
#[derive(Debug, Clone)]
pub struct DirectoryEvaluation {
    pub results: Vec<(PathBuf, String, Evaluation)>,
    /// results 中最佳项的下标
    pub best: Option<usize>,
}

/// 单次迭代的产出
enum IterationResult {
    Selected {
        selection: BestSelection,
        best: VariantRecord,
    },
    /// 没有变体过质量线
    NothingPassed,
}

pub struct Pipeline {
    config: Arc<AppConfig>,
    store: Arc<dyn PipelineStore>,
    generator: Arc<dyn ImageGenerator>,
    describer: Arc<dyn ImageDescriber>,
    refiner: Arc<dyn PromptRefiner>,
    images: ImageStore,
    scheduler: Arc<TaskScheduler>,
    retry: RetryPolicy,
    grader: Grader,
    selector: BestVariantSelector,
    cancel: CancellationToken,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn PipelineStore>,
        generator: Arc<dyn ImageGenerator>,
        describer: Arc<dyn ImageDescriber>,
        refiner: Arc<dyn PromptRefiner>,
        scheduler: Arc<TaskScheduler>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Result<Self, PipelineError> {
        let grader = Grader::new(
            config.pipeline.quality_threshold,
            config.pipeline.refinement_threshold,
        )?;
        let selector = BestVariantSelector::new(config.pipeline.quality_threshold);
        let images = ImageStore::new(config.app.output_dir.clone());
        Ok(Self {
            config,
            store,
            generator,
            describer,
            refiner,
            images,
            scheduler,
            retry,
            grader,
            selector,
            cancel,
        })
    }

    /// 批量运行；并发度为 max_concurrent_prompts，取消后不再领取新提示词
    pub async fn run_batch(&self, prompts: Vec<Prompt>) -> RunSummary {
        let concurrency = self.config.pipeline.max_concurrent_prompts.max(1);
        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            "Running {} prompts (concurrency {}, max {} iterations)",
            prompts.len(),
            concurrency,
            self.config.pipeline.max_iterations
        );

        let outcomes = stream::iter(prompts.into_iter().map(|prompt| async move {
            let outcome = if self.cancel.is_cancelled() {
                PromptOutcome::Cancelled { iteration: 0 }
            } else {
                self.run_prompt(&prompt).await
            };
            (prompt.id, outcome)
        }))
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

        let summary = RunSummary { outcomes };
        tracing::info!(%run_id, "{}", summary);
        summary
    }

    /// 运行单个提示词直到 Completed / Failed / 软失败 / 取消；错误不向上传播
    pub async fn run_prompt(&self, prompt: &Prompt) -> PromptOutcome {
        match self.drive(prompt).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // 写状态本身出错时只能记录日志
                tracing::error!(prompt_id = %prompt.id, "Prompt failed: {}", e);
                PromptOutcome::Failed {
                    iteration: 0,
                    error: e.to_string(),
                }
            }
        }
    }

    /// 续跑起点：None 表示已完成应跳过
    async fn starting_point(&self, prompt: &Prompt) -> Result<Option<(u32, String)>, PipelineError> {
        let fresh = Some((1, prompt.prompt.clone()));
        if !self.config.pipeline.resume {
            return Ok(fresh);
        }
        let Some(status) = self.store.get_prompt_status(&prompt.id).await? else {
            return Ok(fresh);
        };
        let max = self.config.pipeline.max_iterations;

        match status.status {
            PromptRunStatus::Completed => Ok(None),
            PromptRunStatus::Pending => Ok(fresh),
            PromptRunStatus::InProgress | PromptRunStatus::Error => {
                let k = status.current_iteration.min(max);
                if k == 0 {
                    return Ok(fresh);
                }
                if k < max {
                    if let Some(refined) = self.store.get_refined_prompt(&prompt.id, k).await? {
                        return Ok(Some((k + 1, refined.refined_text)));
                    }
                }
                let working = if k > 1 {
                    self.store
                        .get_refined_prompt(&prompt.id, k - 1)
                        .await?
                        .map(|r| r.refined_text)
                        .unwrap_or_else(|| prompt.prompt.clone())
                } else {
                    prompt.prompt.clone()
                };
                Ok(Some((k, working)))
            }
        }
    }

    async fn drive(&self, prompt: &Prompt) -> Result<PromptOutcome, PipelineError> {
        self.store.upsert_prompt(prompt).await?;

        let Some((start, working)) = self.starting_point(prompt).await? else {
            tracing::info!(prompt_id = %prompt.id, "Already completed, skipping");
            return Ok(PromptOutcome::Skipped);
        };
        if start > 1 {
            tracing::info!(prompt_id = %prompt.id, "Resuming at iteration {}", start);
        }

        let max = self.config.pipeline.max_iterations;
        let mut state = PromptState::new(&prompt.id, &working);
        state.iteration = start - 1;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(prompt_id = %prompt.id, "Cancelled before iteration {}", state.iteration + 1);
                return Ok(PromptOutcome::Cancelled {
                    iteration: state.iteration,
                });
            }

            state.transition(PromptPhase::Generating)?;
            let iteration = state.iteration;
            self.store
                .set_prompt_status(&prompt.id, iteration, PromptRunStatus::InProgress)
                .await?;
            tracing::info!(prompt_id = %prompt.id, iteration, "Starting iteration {}/{}", iteration, max);

            let result = match self.run_iteration(prompt, &mut state).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(prompt_id = %prompt.id, iteration, "Iteration failed: {}", e);
                    let mut record = IterationRecord::pending(&prompt.id, iteration, &state.working_text);
                    record.status = IterationStatus::Failed;
                    self.store.save_iteration(&record).await?;
                    self.store
                        .set_prompt_status(&prompt.id, iteration, PromptRunStatus::Error)
                        .await?;
                    state.transition(PromptPhase::Failed)?;
                    return Ok(PromptOutcome::Failed {
                        iteration,
                        error: e.to_string(),
                    });
                }
            };

            let (selection, best) = match result {
                IterationResult::Selected { selection, best } => (selection, best),
                IterationResult::NothingPassed => {
                    tracing::warn!(
                        prompt_id = %prompt.id,
                        iteration,
                        "No variant passed the quality threshold, stopping"
                    );
                    self.store
                        .set_prompt_status(&prompt.id, iteration, PromptRunStatus::Error)
                        .await?;
                    state.transition(PromptPhase::Failed)?;
                    return Ok(PromptOutcome::SoftFailed { iteration });
                }
            };

            let reason = if !best.needs_refinement {
                Some(CompletionReason::Satisfied)
            } else if iteration >= max {
                Some(CompletionReason::IterationCap)
            } else {
                None
            };

            if let Some(reason) = reason {
                self.mark_iteration_completed(prompt, &state, &selection, &best).await?;
                self.store
                    .set_prompt_status(&prompt.id, iteration, PromptRunStatus::Completed)
                    .await?;
                state.transition(PromptPhase::Completed)?;
                self.publish(&prompt.id, &selection).await;
                tracing::info!(
                    prompt_id = %prompt.id,
                    iteration,
                    "Completed ({:?}) with best score {:.3}",
                    reason,
                    selection.score
                );
                return Ok(PromptOutcome::Completed {
                    iterations: iteration,
                    best_score: selection.score,
                    reason,
                });
            }

            state.transition(PromptPhase::Refining)?;
            let refined = match self.refine(prompt, iteration, &best).await {
                Ok(refined) => refined,
                Err(e) => {
                    tracing::error!(prompt_id = %prompt.id, iteration, "Refinement failed: {}", e);
                    self.store
                        .set_prompt_status(&prompt.id, iteration, PromptRunStatus::Error)
                        .await?;
                    state.transition(PromptPhase::Failed)?;
                    return Ok(PromptOutcome::Failed {
                        iteration,
                        error: e.to_string(),
                    });
                }
            };
            self.mark_iteration_completed(prompt, &state, &selection, &best).await?;
            tracing::info!(prompt_id = %prompt.id, iteration, "Refined prompt: {}", refined);
            state.working_text = refined;
        }
    }

    async fn run_iteration(
        &self,
        prompt: &Prompt,
        state: &mut PromptState,
    ) -> Result<IterationResult, PipelineError> {
        let iteration = state.iteration;
        let mut record = IterationRecord::pending(&prompt.id, iteration, &state.working_text);
        self.store.save_iteration(&record).await?;
        self.store.reset_iteration(&prompt.id, iteration).await?;

        let count = self.config.pipeline.variant_count(None);
        let variants = self
            .generate_variants(prompt, iteration, &state.working_text, count)
            .await?;
        record.status = IterationStatus::Generated;
        self.store.save_iteration(&record).await?;

        state.transition(PromptPhase::Evaluating)?;
        let descriptions = self.describe_variants(&variants).await;

        state.transition(PromptPhase::Grading)?;
        let graded = self.grade_variants(prompt, variants, descriptions).await?;

        let selection = self
            .selector
            .select_and_save(self.store.as_ref(), &prompt.id, iteration, &graded)
            .await?;

        record.status = IterationStatus::Evaluated;
        let Some(selection) = selection else {
            // 软失败：记录本轮最高分，行保持 evaluated
            if let Some(top) = graded
                .iter()
                .max_by(|a, b| a.score_or_zero().total_cmp(&b.score_or_zero()))
            {
                record.evaluation = top.description.clone();
                record.score = top.score;
            }
            self.store.save_iteration(&record).await?;
            return Ok(IterationResult::NothingPassed);
        };

        let best = graded
            .into_iter()
            .find(|v| v.variant == selection.variant)
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("selected variant {} not found", selection.variant))
            })?;
        record.image_path = Some(selection.image_path.clone());
        record.evaluation = best.description.clone();
        record.score = best.score;
        self.store.save_iteration(&record).await?;

        Ok(IterationResult::Selected { selection, best })
    }

    async fn mark_iteration_completed(
        &self,
        prompt: &Prompt,
        state: &PromptState,
        selection: &BestSelection,
        best: &VariantRecord,
    ) -> Result<(), PipelineError> {
        let record = IterationRecord {
            prompt_id: prompt.id.clone(),
            iteration: state.iteration,
            image_path: Some(selection.image_path.clone()),
            prompt_text: state.working_text.clone(),
            evaluation: best.description.clone(),
            score: best.score,
            status: IterationStatus::Completed,
        };
        self.store.save_iteration(&record).await
    }

    async fn publish(&self, prompt_id: &str, selection: &BestSelection) {
        if !self.config.pipeline.publish_current {
            return;
        }
        match self
            .images
            .publish_current(prompt_id, Path::new(&selection.image_path))
            .await
        {
            Ok(path) => tracing::debug!(prompt_id, "Published {}", path.display()),
            Err(e) => tracing::warn!(prompt_id, "Could not publish current image: {}", e),
        }
    }

    /// 记录一次外部调用；记录失败只打日志
    async fn record_call<T>(&self, api_name: &str, endpoint: &str, result: &Result<T, PipelineError>) {
        let call = match result {
            Ok(_) => ApiCall::success(api_name, endpoint),
            Err(e) => ApiCall::failure(api_name, endpoint, e),
        };
        if let Err(e) = self.store.record_api_call(&call).await {
            tracing::warn!("Failed to record {} call: {}", endpoint, e);
        }
    }

    /// 生成一张图并取回字节；下载失败与生成失败一样重试，每次尝试都记一条调用
    async fn generate_one(&self, request: &GenerationRequest) -> Result<Vec<u8>, PipelineError> {
        let _permit = self.scheduler.acquire(TaskKind::Generation).await?;
        self.retry
            .run("image generation", || async move {
                let image = self.generator.generate(request).await;
                self.record_call(self.generator.name(), "generate", &image).await;
                self.images.fetch(&image?).await
            })
            .await
    }

    /// 并发生成 count 个变体；失败的跳过，成功的按顺序编号 0..n 落盘入库
    pub async fn generate_variants(
        &self,
        prompt: &Prompt,
        iteration: u32,
        working_text: &str,
        count: usize,
    ) -> Result<Vec<VariantRecord>, PipelineError> {
        let request = GenerationRequest::from_config(
            prompt.generation_text(working_text),
            &self.config.generation,
        );
        let results = join_all((0..count).map(|_| self.generate_one(&request))).await;

        let mut variants = Vec::with_capacity(count);
        let mut last_error = None;
        for result in results {
            match result {
                Ok(bytes) => {
                    let index = variants.len();
                    let path = self.images.variant_path(&prompt.id, iteration, Some(index));
                    self.images.write(&bytes, &path).await?;
                    let mut record = VariantRecord::generated(
                        &prompt.id,
                        iteration,
                        index,
                        &path.to_string_lossy(),
                    );
                    record.id = self.store.save_variant(&record).await?;
                    variants.push(record);
                }
                Err(e) => {
                    tracing::warn!(prompt_id = %prompt.id, iteration, "Variant generation failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if variants.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                PipelineError::InvalidResponse("no image was generated".into())
            }));
        }
        tracing::info!(
            prompt_id = %prompt.id,
            iteration,
            "Generated {}/{} variants",
            variants.len(),
            count
        );
        Ok(variants)
    }

    async fn describe_one(&self, image_path: &Path) -> Result<String, PipelineError> {
        let _permit = self.scheduler.acquire(TaskKind::Vision).await?;
        self.retry
            .run("image description", || async move {
                let result = self.describer.describe(image_path).await;
                self.record_call(self.describer.name(), "describe", &result).await;
                result
            })
            .await
    }

    async fn refine_text(
        &self,
        original_prompt: &str,
        evaluation_text: &str,
    ) -> Result<String, PipelineError> {
        let _permit = self.scheduler.acquire(TaskKind::Refinement).await?;
        self.retry
            .run("prompt refinement", || async move {
                let result = self.refiner.refine(original_prompt, evaluation_text).await;
                self.record_call(self.refiner.name(), "refine", &result).await;
                result
            })
            .await
    }

    async fn describe_variants(&self, variants: &[VariantRecord]) -> Vec<Result<String, PipelineError>> {
        join_all(
            variants
                .iter()
                .map(|v| self.describe_one(Path::new(&v.image_path))),
        )
        .await
    }

    /// 按原始提示词给每个描述打分并写回；描述失败的变体被丢弃，全部丢弃则报错
    async fn grade_variants(
        &self,
        prompt: &Prompt,
        variants: Vec<VariantRecord>,
        descriptions: Vec<Result<String, PipelineError>>,
    ) -> Result<Vec<VariantRecord>, PipelineError> {
        let mut graded = Vec::with_capacity(variants.len());
        let mut last_error = None;

        for (mut variant, description) in variants.into_iter().zip(descriptions) {
            let description = match description {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(
                        prompt_id = %prompt.id,
                        variant = variant.variant,
                        "Description failed, dropping variant: {}",
                        e
                    );
                    last_error = Some(e);
                    continue;
                }
            };
            let evaluation = self.grader.grade(&description, &prompt.prompt);
            tracing::debug!(
                prompt_id = %prompt.id,
                variant = variant.variant,
                "Score {:.3} (passed: {}, needs refinement: {})",
                evaluation.score,
                evaluation.passed,
                evaluation.needs_refinement
            );
            variant.description = Some(description);
            variant.score = Some(evaluation.score);
            variant.passed = evaluation.passed;
            variant.needs_refinement = evaluation.needs_refinement;
            variant.feedback = Some(evaluation.feedback);
            self.store.update_variant_evaluation(&variant).await?;
            graded.push(variant);
        }

        if graded.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                PipelineError::InvalidResponse("no variant could be described".into())
            }));
        }
        Ok(graded)
    }

    /// 改写并落库；evaluation_text 为最佳变体的描述加评分反馈
    async fn refine(
        &self,
        prompt: &Prompt,
        iteration: u32,
        best: &VariantRecord,
    ) -> Result<String, PipelineError> {
        let evaluation_text = format!(
            "{}\n\nScore: {:.2}. {}",
            best.description.as_deref().unwrap_or_default(),
            best.score_or_zero(),
            best.feedback.as_deref().unwrap_or_default()
        );

        let refined = self.refine_text(&prompt.prompt, &evaluation_text).await?;

        self.store
            .save_refined_prompt(&RefinedPromptRecord {
                prompt_id: prompt.id.clone(),
                iteration,
                refined_text: refined.clone(),
                evaluation_text,
                needs_refinement: best.needs_refinement,
            })
            .await?;
        Ok(refined)
    }

    /// 只为一个提示词生成第 1 轮的变体（variants 为 None 时取配置值）
    pub async fn generate_batch(
        &self,
        prompt: &Prompt,
        variants: Option<usize>,
    ) -> Result<Vec<VariantRecord>, PipelineError> {
        self.store.upsert_prompt(prompt).await?;
        let mut record = IterationRecord::pending(&prompt.id, 1, &prompt.prompt);
        self.store.save_iteration(&record).await?;
        self.store.reset_iteration(&prompt.id, 1).await?;

        let count = self.config.pipeline.variant_count(variants);
        let generated = self.generate_variants(prompt, 1, &prompt.prompt, count).await;
        record.status = match generated {
            Ok(_) => IterationStatus::Generated,
            Err(_) => IterationStatus::Failed,
        };
        self.store.save_iteration(&record).await?;
        generated
    }

    /// 描述一张图并在旁边写 `{stem}_description.txt`；给出提示词时顺带评分
    pub async fn evaluate_single_image(
        &self,
        image_path: &Path,
        original_prompt: Option<&str>,
    ) -> Result<(String, Option<Evaluation>), PipelineError> {
        if !image_path.is_file() {
            return Err(PipelineError::InvalidInput(format!(
                "image not found: {}",
                image_path.display()
            )));
        }
        let description = self.describe_one(image_path).await?;
        let written = ImageStore::write_description(image_path, &description).await?;
        tracing::info!("Description written to {}", written.display());

        let evaluation = match original_prompt {
            Some(prompt) => Some(self.grader.try_grade(&description, prompt)?),
            None => None,
        };
        Ok((description, evaluation))
    }

    /// 按描述评分；需要时改写，否则原样返回提示词
    pub async fn refine_single_prompt(
        &self,
        original_prompt: &str,
        description: &str,
    ) -> Result<(Evaluation, String), PipelineError> {
        let evaluation = self.grader.try_grade(description, original_prompt)?;
        if !evaluation.needs_refinement {
            return Ok((evaluation, original_prompt.to_string()));
        }
        let evaluation_text = format!(
            "{}\n\nScore: {:.2}. {}",
            description, evaluation.score, evaluation.feedback
        );
        let refined = self.refine_text(original_prompt, &evaluation_text).await?;
        Ok((evaluation, refined))
    }

    /// 对目录内所有 png 描述、评分并选出最佳；不写数据库
    pub async fn evaluate_and_select(
        &self,
        dir: &Path,
        original_prompt: &str,
    ) -> Result<DirectoryEvaluation, PipelineError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if is_png {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "no png images in {}",
                dir.display()
            )));
        }

        let descriptions = join_all(paths.iter().map(|p| self.describe_one(p))).await;
        let mut results = Vec::new();
        let mut candidates = Vec::new();
        for (path, description) in paths.into_iter().zip(descriptions) {
            match description {
                Ok(description) => {
                    let evaluation = self.grader.try_grade(&description, original_prompt)?;
                    let mut candidate =
                        VariantRecord::generated("", 0, results.len(), &path.to_string_lossy());
                    candidate.score = Some(evaluation.score);
                    candidates.push(candidate);
                    results.push((path, description, evaluation));
                }
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        let best = self.selector.select(&candidates).map(|v| v.variant);
        Ok(DirectoryEvaluation { results, best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_display() {
        let summary = RunSummary {
            outcomes: vec![
                (
                    "a".into(),
                    PromptOutcome::Completed {
                        iterations: 1,
                        best_score: 0.9,
                        reason: CompletionReason::Satisfied,
                    },
                ),
                ("b".into(), PromptOutcome::SoftFailed { iteration: 2 }),
                (
                    "c".into(),
                    PromptOutcome::Failed {
                        iteration: 1,
                        error: "boom".into(),
                    },
                ),
                ("d".into(), PromptOutcome::Skipped),
            ],
        };
        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert_eq!(summary.outcome("d"), Some(&PromptOutcome::Skipped));
        assert_eq!(
            summary.to_string(),
            "4 prompts: 1 completed, 1 soft-failed, 1 failed, 1 skipped, 0 cancelled"
        );
    }
}
