//! # ROBERT CLI
//!
//! Command-line dashboard for the ROBERT robotic arm.
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（推荐用于脚本）
//!
//! ```bash
//! # 查看可用串口
//! robert-cli ports
//!
//! # 执行运动脚本（内部：连接 -> 执行 -> 断开）
//! robert-cli run --script demo.robert --port /dev/ttyACM0
//!
//! # 管理保存的位置
//! robert-cli positions list
//! ```
//!
//! ### REPL 模式（推荐用于调试）
//!
//! ```bash
//! $ robert-cli shell
//! robert> connect /dev/ttyACM0
//! robert> calibrate all
//! robert> toggle J1
//! robert> move J1=90 J2=45
//! robert> store
//! robert> exit
//! ```
//!
//! 后端为进程内的模拟机械臂。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod modes;
mod validation;

use commands::{ConfigCommand, PortsCommand, PositionsCommand, RunCommand, StatusCommand};
use modes::repl::run_repl;

/// ROBERT CLI - 机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "robert-cli")]
#[command(about = "Command-line dashboard for the ROBERT robotic arm", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/robert/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 列出可用串口
    Ports {
        #[command(flatten)]
        args: PortsCommand,
    },

    /// 连接并显示关节状态
    Status {
        #[command(flatten)]
        args: StatusCommand,
    },

    /// 管理保存的位置
    #[command(subcommand)]
    Positions(PositionsCommand),

    /// 执行运动脚本
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 启动交互式 Shell（REPL 模式）
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（写到 stderr，stdout 留给命令输出）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive("robert_cli=info".parse()?)
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config_path = commands::config::resolve_path(cli.config)?;

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path),

        Commands::Ports { args } => args.execute(&config_path).await,

        Commands::Status { args } => args.execute(&config_path).await,

        Commands::Positions(cmd) => cmd.execute(&config_path).await,

        Commands::Run { args } => args.execute(&config_path).await,

        Commands::Shell => run_repl(&config_path).await,
    }
}
