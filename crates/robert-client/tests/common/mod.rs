//! 集成测试共享工具

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use robert_client::{
    ClientConfig, Dashboard, DashboardBuilder, Notification, Notifier, SimulatedArm,
};
use std::time::Duration;

pub const PORT: &str = "/dev/ttyACM0";

/// 测试夹具：模拟机械臂 + 仪表盘 + 通知接收端
pub struct Fixture {
    pub arm: SimulatedArm,
    pub dashboard: Dashboard<SimulatedArm>,
    pub notifications: Receiver<Notification>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let arm = SimulatedArm::new();
        let (notifier, notifications) = Notifier::channel();
        let dashboard = DashboardBuilder::new(arm.clone())
            .config(config)
            .notifier(notifier)
            .build()
            .unwrap();
        Self {
            arm,
            dashboard,
            notifications,
        }
    }

    /// 已连接的夹具，调用记录和通知已清空
    pub async fn connected() -> Self {
        let fixture = Self::new();
        fixture.dashboard.connection().connect_to_port(PORT).await.unwrap();
        fixture.arm.clear_calls();
        fixture.drain();
        fixture
    }

    /// 取出当前所有通知
    pub fn drain(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter(Notification::is_error)
            .map(|n| n.message)
            .collect()
    }
}

/// 让后台订阅任务处理已推送的事件
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
