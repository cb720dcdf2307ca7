//! positions 命令
//!
//! 查看、保存和删除位置（只有保存需要连接）

use anyhow::Result;
use clap::Subcommand;
use robert_client::format_angle;
use robert_protocol::Joint;
use std::path::Path;

use crate::modes::oneshot::OneShotMode;
use crate::modes::{build_dashboard, print_notifications};

/// 位置管理命令
#[derive(Subcommand, Debug)]
pub enum PositionsCommand {
    /// 列出所有位置
    List,

    /// 连接机械臂并保存当前位置
    Store {
        /// 串口（默认第一个可用串口）
        #[arg(short, long)]
        port: Option<String>,
    },

    /// 显示某个位置的角度
    Show {
        /// 位置编号（如 pos_0）
        id: String,

        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },

    /// 删除位置
    Delete {
        /// 位置编号（如 pos_0）
        id: String,
    },
}

impl PositionsCommand {
    pub async fn execute(&self, config_path: &Path) -> Result<()> {
        match self {
            PositionsCommand::List => {
                let (dashboard, _) = build_dashboard(config_path)?;
                let ids = dashboard.positions().list();
                if ids.is_empty() {
                    println!("(没有保存的位置)");
                }
                for id in ids {
                    println!("{}", id);
                }
            },

            PositionsCommand::Show { id, json } => {
                let (dashboard, _) = build_dashboard(config_path)?;
                let angles = dashboard.positions().load(id)?;
                if *json {
                    println!("{}", serde_json::to_string(angles.as_array())?);
                } else {
                    println!("📍 {}:", id);
                    for joint in Joint::ALL {
                        println!("  {}: {}", joint, format_angle(angles[joint]));
                    }
                }
            },

            PositionsCommand::Store { port } => {
                let mode = OneShotMode::connect(config_path, port.as_deref()).await?;
                let result = mode.dashboard().store_current_position();
                mode.flush();
                mode.finish().await?;
                println!("📍 {}", result?);
            },

            PositionsCommand::Delete { id } => {
                let (dashboard, notifications) = build_dashboard(config_path)?;
                let deleted = dashboard.delete_position(id);
                print_notifications(&notifications);
                if !deleted {
                    anyhow::bail!("位置不存在: {}", id);
                }
            },
        }

        Ok(())
    }
}
