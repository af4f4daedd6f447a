//! 命令行：参数定义与子命令分发

pub mod commands;
pub mod menu;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "lumen", version, about = "Iterative text-to-image pipeline: generate, describe, grade, refine")]
pub struct Cli {
    /// Extra TOML config file, layered over config/default.toml
    #[arg(long, short, global = true, env = "LUMEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG still wins when set)
    #[arg(long, global = true, env = "LUMEN_DEBUG")]
    pub debug: bool,

    /// Use mock collaborators instead of the hosted APIs
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Input prompts file (defaults to app.input_file)
    #[arg(long, short, global = true)]
    pub input: Option<PathBuf>,

    /// Output directory (defaults to app.output_dir)
    #[arg(long, short, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fill in missing prompts in the input file with the LLM
    GeneratePrompts {
        /// Where to write the updated file (defaults to overwriting the input)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate iteration-1 variants for a single prompt
    Batch {
        prompt_id: String,
        #[arg(long)]
        variants: Option<usize>,
    },
    /// Describe, grade and pick the best of all png images in a directory
    Evaluate {
        dir: PathBuf,
        #[arg(long)]
        prompt: String,
    },
    /// Run the full generate / evaluate / refine loop over the input file
    Run {
        /// Ignore stored progress and start every prompt at iteration 1
        #[arg(long)]
        fresh: bool,
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Describe a single image (writes <stem>_description.txt next to it)
    Describe {
        image: PathBuf,
        /// Grade the description against this prompt
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Grade a description against a prompt and refine the prompt if needed
    Refine {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        description: String,
    },
    /// Show per-prompt progress from the database
    Status,
    /// Interactive menu
    Menu,
}

impl Cli {
    /// 把命令行覆盖项合并进配置
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.app.input_file = input.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.app.output_dir = dir.clone();
        }
        if let Some(Command::Run {
            fresh,
            max_iterations,
        }) = &self.command
        {
            if *fresh {
                config.pipeline.resume = false;
            }
            if let Some(max) = max_iterations {
                config.pipeline.max_iterations = *max;
            }
        }
    }
}
