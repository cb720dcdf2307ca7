//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 连接机械臂
//! 3. 执行操作
//! 4. 断开连接

use anyhow::Result;
use crossbeam_channel::Receiver;
use robert_client::{Dashboard, Notification, SimulatedArm};
use std::path::Path;

use super::{build_dashboard, print_notifications};

/// One-shot 会话
pub struct OneShotMode {
    dashboard: Dashboard<SimulatedArm>,
    notifications: Receiver<Notification>,
}

impl OneShotMode {
    /// 构造并连接
    ///
    /// 未指定串口时使用第一个可用串口。
    pub async fn connect(config_path: &Path, port: Option<&str>) -> Result<Self> {
        let (dashboard, notifications) = build_dashboard(config_path)?;
        let mode = Self {
            dashboard,
            notifications,
        };

        let port = match port {
            Some(port) => port.to_string(),
            None => {
                let ports = mode.dashboard.connection().refresh_ports().await;
                mode.flush();
                ports?
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("没有可用串口"))?
            },
        };

        println!("⏳ 连接到 {}...", port);
        let result = mode.dashboard.connection().connect_to_port(&port).await;
        mode.flush();
        result?;

        Ok(mode)
    }

    pub fn dashboard(&self) -> &Dashboard<SimulatedArm> {
        &self.dashboard
    }

    /// 打印待处理通知
    pub fn flush(&self) {
        print_notifications(&self.notifications);
    }

    /// 断开连接
    pub async fn finish(self) -> Result<()> {
        let result = self.dashboard.connection().disconnect_port().await;
        self.flush();
        Ok(result?)
    }
}
