//! 交互式菜单
//!
//! 无子命令时进入。完整组件在第一次需要时装配，之后各菜单项复用。

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use crate::cli::commands::{self, CommandContext};
use crate::core::{PipelineComponents, ShutdownReason};

const MENU: &str = "\
1) Generate missing prompts
2) Generate a batch of variants for one prompt
3) Evaluate a directory of images
4) Run the full pipeline
5) Describe a single image
6) Refine a prompt
7) Show status
0) Exit";

struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    /// 读一行；EOF 返回 None
    async fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }

    async fn ask_required(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        loop {
            match self.ask(label).await? {
                Some(answer) if answer.is_empty() => println!("A value is required"),
                other => return Ok(other),
            }
        }
    }
}

pub async fn run(ctx: &mut CommandContext<'_>) -> anyhow::Result<()> {
    let mut input = Input {
        lines: BufReader::new(tokio::io::stdin()).lines(),
    };
    let mut components: Option<PipelineComponents> = None;

    while !ctx.shutdown.is_shutdown() {
        println!("\n{}", MENU);
        let token = ctx.shutdown.token();
        let choice = tokio::select! {
            _ = token.cancelled() => break,
            choice = input.ask("> ") => choice?,
        };
        let Some(choice) = choice else { break };

        let result = match choice.as_str() {
            "0" | "q" | "exit" => {
                ctx.shutdown.shutdown(ShutdownReason::UserInitiated);
                break;
            }
            "1" => {
                let builder = ctx.builder();
                match builder.build_llm() {
                    Ok(llm) => {
                        let generator = builder.build_prompt_generator(llm);
                        commands::generate_prompts(&generator, &ctx.config, None).await
                    }
                    Err(e) => Err(e.into()),
                }
            }
            "7" => match ensure(ctx, &mut components).await {
                Ok(c) => commands::status(c.store.as_ref()).await,
                Err(e) => Err(e),
            },
            "2" | "3" | "4" | "5" | "6" => {
                let c = match ensure(ctx, &mut components).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!("{:#}", e);
                        continue;
                    }
                };
                match pipeline_item(&choice, c, &mut input).await {
                    Ok(Some(result)) => result,
                    Ok(None) => break,
                    Err(e) => Err(e),
                }
            }
            other => {
                println!("Unknown option '{}'", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!("{:#}", e);
        }
    }
    Ok(())
}

async fn ensure<'c>(
    ctx: &mut CommandContext<'_>,
    slot: &'c mut Option<PipelineComponents>,
) -> anyhow::Result<&'c PipelineComponents> {
    if slot.is_none() {
        *slot = Some(ctx.components().await?);
    }
    slot.as_ref()
        .ok_or_else(|| anyhow::anyhow!("pipeline components unavailable"))
}

/// 需要完整流水线的菜单项；读到 EOF 返回 Ok(None)
async fn pipeline_item(
    choice: &str,
    c: &PipelineComponents,
    input: &mut Input,
) -> anyhow::Result<Option<anyhow::Result<()>>> {
    let result = match choice {
        "2" => {
            let Some(id) = input.ask_required("Prompt id: ").await? else { return Ok(None) };
            let Some(count) = input.ask("Variants (blank for default): ").await? else {
                return Ok(None);
            };
            let variants = if count.is_empty() {
                None
            } else {
                match count.parse::<usize>() {
                    Ok(n) => Some(n),
                    Err(_) => return Ok(Some(Err(anyhow::anyhow!("'{}' is not a number", count)))),
                }
            };
            commands::batch(c, &id, variants).await
        }
        "3" => {
            let Some(dir) = input.ask_required("Image directory: ").await? else { return Ok(None) };
            let Some(prompt) = input.ask_required("Original prompt: ").await? else {
                return Ok(None);
            };
            commands::evaluate(c, &PathBuf::from(dir), &prompt).await
        }
        "4" => commands::run(c).await.map(|_| ()),
        "5" => {
            let Some(image) = input.ask_required("Image path: ").await? else { return Ok(None) };
            let Some(prompt) = input.ask("Prompt to grade against (optional): ").await? else {
                return Ok(None);
            };
            let prompt = (!prompt.is_empty()).then_some(prompt);
            commands::describe(c, &PathBuf::from(image), prompt.as_deref()).await
        }
        "6" => {
            let Some(prompt) = input.ask_required("Original prompt: ").await? else {
                return Ok(None);
            };
            let Some(description) = input.ask_required("Image description: ").await? else {
                return Ok(None);
            };
            commands::refine(c, &prompt, &description).await
        }
        _ => Ok(()),
    };
    Ok(Some(result))
}
