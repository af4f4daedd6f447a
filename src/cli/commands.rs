//! 子命令实现
//!
//! 每个子命令只装配自己需要的组件：generate-prompts 只要文本 LLM，status 只要数据库，
//! 其余走完整的 PipelineBuilder::build。

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};

use crate::cli::{menu, Cli, Command};
use crate::config::AppConfig;
use crate::core::{
    PipelineBuilder, PipelineComponents, ShutdownCoordinator, ShutdownManager, StoreCleanup,
};
use crate::pipeline::RunSummary;
use crate::prompts::{load_batch, Prompt, PromptGenerator};
use crate::store::PipelineStore;

/// 执行上下文：配置、关闭信号与清理登记
pub struct CommandContext<'a> {
    pub config: Arc<AppConfig>,
    pub dry_run: bool,
    pub shutdown: &'a ShutdownManager,
    pub coordinator: &'a mut ShutdownCoordinator,
}

impl CommandContext<'_> {
    pub fn builder(&self) -> PipelineBuilder {
        PipelineBuilder::new(self.config.clone())
            .dry_run(self.dry_run)
            .with_cancel(self.shutdown.token())
    }

    /// 完整装配，并登记关闭时的数据库清理
    pub async fn components(&mut self) -> anyhow::Result<PipelineComponents> {
        let components = self
            .builder()
            .build()
            .await
            .context("Failed to build pipeline")?;
        self.coordinator
            .register(StoreCleanup::new(components.store.clone()));
        Ok(components)
    }
}

pub async fn execute(cli: &Cli, ctx: &mut CommandContext<'_>) -> anyhow::Result<()> {
    match &cli.command {
        None | Some(Command::Menu) => menu::run(ctx).await,
        Some(Command::GeneratePrompts { out }) => {
            let builder = ctx.builder();
            let generator = builder.build_prompt_generator(builder.build_llm()?);
            generate_prompts(&generator, &ctx.config, out.as_deref()).await
        }
        Some(Command::Status) => {
            let store = ctx.builder().build_store().await?;
            ctx.coordinator.register(StoreCleanup::new(store.clone()));
            status(store.as_ref()).await
        }
        Some(Command::Batch {
            prompt_id,
            variants,
        }) => {
            let components = ctx.components().await?;
            batch(&components, prompt_id, *variants).await
        }
        Some(Command::Evaluate { dir, prompt }) => {
            let components = ctx.components().await?;
            evaluate(&components, dir, prompt).await
        }
        Some(Command::Run { .. }) => {
            let components = ctx.components().await?;
            let summary = run(&components).await?;
            if !summary.is_success() {
                bail!("{} of {} prompts failed", summary.failed(), summary.outcomes.len());
            }
            Ok(())
        }
        Some(Command::Describe { image, prompt }) => {
            let components = ctx.components().await?;
            describe(&components, image, prompt.as_deref()).await
        }
        Some(Command::Refine {
            prompt,
            description,
        }) => {
            let components = ctx.components().await?;
            refine(&components, prompt, description).await
        }
    }
}

pub async fn generate_prompts(
    generator: &PromptGenerator,
    config: &AppConfig,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let input = &config.app.input_file;
    let stats = generator
        .fill_missing(input, out, &config.pipeline.default_model)
        .await
        .with_context(|| format!("Failed to generate prompts for {}", input.display()))?;
    println!("{}", stats);
    Ok(())
}

async fn load_prompts(config: &AppConfig) -> anyhow::Result<Vec<Prompt>> {
    let batch = load_batch(&config.app.input_file, &config.pipeline.default_model).await?;
    if batch.prompts.is_empty() {
        bail!("No valid prompts in {}", config.app.input_file.display());
    }
    Ok(batch.prompts)
}

pub async fn batch(
    components: &PipelineComponents,
    prompt_id: &str,
    variants: Option<usize>,
) -> anyhow::Result<()> {
    let prompts = load_prompts(&components.config).await?;
    let Some(prompt) = prompts.into_iter().find(|p| p.id == prompt_id) else {
        bail!("Prompt '{}' not found in input file", prompt_id);
    };
    let generated = components.pipeline.generate_batch(&prompt, variants).await?;
    for v in &generated {
        println!("v{}: {}", v.variant, v.image_path);
    }
    println!("Generated {} variants for {}", generated.len(), prompt.id);
    Ok(())
}

pub async fn evaluate(components: &PipelineComponents, dir: &Path, prompt: &str) -> anyhow::Result<()> {
    let result = components.pipeline.evaluate_and_select(dir, prompt).await?;
    for (i, (path, _, evaluation)) in result.results.iter().enumerate() {
        let marker = if result.best == Some(i) { "*" } else { " " };
        println!(
            "{} {:.3}  {}  {}",
            marker,
            evaluation.score,
            path.display(),
            evaluation.feedback
        );
    }
    if result.best.is_none() {
        println!("No image reached the quality threshold");
    }
    Ok(())
}

pub async fn run(components: &PipelineComponents) -> anyhow::Result<RunSummary> {
    let prompts = load_prompts(&components.config).await?;
    let summary = components.pipeline.run_batch(prompts).await;

    for (id, outcome) in &summary.outcomes {
        println!("{:<24} {:?}", id, outcome);
    }
    println!("{}", summary);

    let (prompt_tokens, completion_tokens, total) = components.llm.token_usage();
    if total > 0 {
        tracing::info!(
            "Refinement token usage: {} prompt + {} completion = {}",
            prompt_tokens,
            completion_tokens,
            total
        );
    }
    Ok(summary)
}

pub async fn describe(
    components: &PipelineComponents,
    image: &Path,
    prompt: Option<&str>,
) -> anyhow::Result<()> {
    let (description, evaluation) = components
        .pipeline
        .evaluate_single_image(image, prompt)
        .await?;
    println!("{}", description);
    if let Some(evaluation) = evaluation {
        println!(
            "\nScore: {:.3} (passed: {}, needs refinement: {})\n{}",
            evaluation.score, evaluation.passed, evaluation.needs_refinement, evaluation.feedback
        );
    }
    Ok(())
}

pub async fn refine(
    components: &PipelineComponents,
    prompt: &str,
    description: &str,
) -> anyhow::Result<()> {
    let (evaluation, refined) = components
        .pipeline
        .refine_single_prompt(prompt, description)
        .await?;
    println!("Score: {:.3}. {}", evaluation.score, evaluation.feedback);
    if evaluation.needs_refinement {
        println!("Refined prompt: {}", refined);
    } else {
        println!("No refinement needed: {}", refined);
    }
    Ok(())
}

pub async fn status(store: &dyn PipelineStore) -> anyhow::Result<()> {
    let statuses = store.list_prompt_statuses().await?;
    if statuses.is_empty() {
        println!("No prompts have been processed yet");
        return Ok(());
    }
    println!("{:<24} {:>9}  {:<12} {}", "prompt", "iteration", "status", "updated");
    for s in statuses {
        println!(
            "{:<24} {:>9}  {:<12} {}",
            s.prompt_id,
            s.current_iteration,
            s.status.as_str(),
            s.updated_at
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::core::RetryPolicy;

    #[tokio::test]
    async fn test_dry_run_command_flow() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prompts.json");
        std::fs::write(
            &input,
            r#"{"prompts":[{"id":"meadow","title":"Meadow","scene":"A meadow","mood":"calm","prompt":""}]}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.app.input_file = input.clone();
        config.app.output_dir = dir.path().join("out");
        config.app.database_path = dir.path().join("lumen.db");
        config.pipeline.variants_per_iteration = 2;
        config.retry.base_delay_ms = 1;
        let config = Arc::new(config);

        let generator = PromptGenerator::new(
            Arc::new(MockLlmClient::with_reply("a calm green meadow")),
            RetryPolicy::none(),
        )
        .with_pacing(std::time::Duration::ZERO);
        generate_prompts(&generator, &config, None).await.unwrap();

        let shutdown = ShutdownManager::new();
        let mut coordinator = ShutdownCoordinator::new();
        let mut ctx = CommandContext {
            config: config.clone(),
            dry_run: true,
            shutdown: &shutdown,
            coordinator: &mut coordinator,
        };
        let components = ctx.components().await.unwrap();
        let summary = run(&components).await.unwrap();
        assert_eq!(summary.outcomes.len(), 1);
        assert!(summary.is_success());

        status(components.store.as_ref()).await.unwrap();
        coordinator.run_cleanup().await;
        assert!(components.store.is_closed());
    }
}
