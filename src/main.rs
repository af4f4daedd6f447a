//! Lumen 命令行入口
//!
//! 初始化日志、加载配置、安装信号处理，然后分发子命令（无子命令时进入交互菜单）。

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lumen::cli::{commands, Cli};
use lumen::config::load_config;
use lumen::core::{ShutdownCoordinator, ShutdownManager};
use lumen::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.debug);

    let mut config = load_config(cli.config.clone()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let mut coordinator = ShutdownCoordinator::new();

    let result = {
        let mut ctx = commands::CommandContext {
            config,
            dry_run: cli.dry_run,
            shutdown: &shutdown,
            coordinator: &mut coordinator,
        };
        commands::execute(&cli, &mut ctx).await
    };

    coordinator.run_cleanup().await;
    result
}
