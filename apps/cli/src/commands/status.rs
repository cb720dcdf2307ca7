//! status 命令
//!
//! 连接后打印关节状态表，然后断开

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::modes::oneshot::OneShotMode;
use crate::modes::print_joint_table;

/// 状态查询命令参数
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// 串口（默认第一个可用串口）
    #[arg(short, long)]
    pub port: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, config_path: &Path) -> Result<()> {
        let mode = OneShotMode::connect(config_path, self.port.as_deref()).await?;

        println!("📊 关节状态:");
        print_joint_table(mode.dashboard());

        mode.finish().await
    }
}
