//! # Ego Capture CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 输出目录清理与 profile 加载
//! - ego 车辆与传感器的生命周期管理
//! - 优雅关闭处理

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use ego_capture_cli::cli::{Cli, Commands};
use ego_capture_cli::commands::{run_capture, run_profile, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(
        ObservabilityConfig {
            log_format: cli.log_format.into(),
            metrics_port: (cli.metrics_port > 0).then_some(cli.metrics_port),
            ..Default::default()
        }
        .with_verbosity(cli.verbose, cli.quiet),
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "Ego capture starting");

    // Execute command
    let result = match &cli.command {
        None => run_capture(&cli.run).await.map(|stats| stats.print_summary()),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Profile(args)) => run_profile(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = format!("{e:#}"), "Command failed");
    }
    info!("Done with ego capture.");

    result
}
