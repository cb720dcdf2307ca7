//! ports 命令

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::modes::{build_dashboard, print_notifications};

/// 串口列表命令参数
#[derive(Args, Debug)]
pub struct PortsCommand {
    /// 以 JSON 数组输出
    #[arg(long)]
    pub json: bool,
}

impl PortsCommand {
    pub async fn execute(&self, config_path: &Path) -> Result<()> {
        let (dashboard, notifications) = build_dashboard(config_path)?;
        let result = dashboard.connection().refresh_ports().await;
        print_notifications(&notifications);
        let ports = result?;

        if self.json {
            println!("{}", serde_json::to_string(&ports)?);
        } else if ports.is_empty() {
            println!("(没有可用串口)");
        } else {
            for port in ports {
                println!("{}", port);
            }
        }
        Ok(())
    }
}
