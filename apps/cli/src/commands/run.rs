//! run 命令
//!
//! 执行运动脚本文件

use anyhow::{Context, Result};
use clap::Args;
use robert_client::{ClientError, parse_file};
use std::path::{Path, PathBuf};

use crate::modes::oneshot::OneShotMode;
use crate::modes::print_joint_table;

/// 脚本执行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 脚本文件路径
    #[arg(short, long)]
    pub script: PathBuf,

    /// 串口（默认第一个可用串口）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 只解析，不执行
    #[arg(long)]
    pub check: bool,
}

impl RunCommand {
    pub async fn execute(&self, config_path: &Path) -> Result<()> {
        println!("📜 加载脚本: {}", self.script.display());

        let instructions = parse_file(&self.script)
            .with_context(|| format!("解析脚本失败: {}", self.script.display()))?;
        println!("    {} 条指令", instructions.len());

        if self.check {
            for (i, instruction) in instructions.iter().enumerate() {
                println!("  {:>3}. {}> {}", i + 1, instruction.command, instruction.params.join(";"));
            }
            return Ok(());
        }

        let mode = OneShotMode::connect(config_path, self.port.as_deref()).await?;
        let result = mode.dashboard().run_script(&instructions).await;
        mode.flush();

        match result {
            Ok(count) => {
                println!();
                println!("📊 执行结果: {} 条指令全部成功", count);
                print_joint_table(mode.dashboard());
                mode.finish().await
            },
            Err(err) => Err(script_failure(err, mode.finish().await)),
        }
    }
}

/// 脚本失败后的断开结果只记录日志，返回的始终是脚本错误
fn script_failure(err: ClientError, disconnect: Result<()>) -> anyhow::Error {
    if let Err(disconnect_err) = disconnect {
        tracing::warn!("disconnect after failed script: {:#}", disconnect_err);
        eprintln!("⚠️  断开连接失败: {:#}", disconnect_err);
    }
    anyhow::Error::new(err).context("脚本执行失败")
}
