//! 运行模式
//!
//! 支持两种模式：
//! - One-shot 模式：每次命令独立连接
//! - REPL 模式：交互式 Shell

pub mod oneshot;
pub mod repl;

use anyhow::Result;
use crossbeam_channel::Receiver;
use robert_client::{Dashboard, DashboardBuilder, Notification, Notifier, SimulatedArm};
use robert_protocol::Joint;
use std::path::Path;

/// 按配置文件构造仪表盘
pub fn build_dashboard(
    config_path: &Path,
) -> Result<(Dashboard<SimulatedArm>, Receiver<Notification>)> {
    let config = crate::commands::config::load(config_path)?;
    let (notifier, notifications) = Notifier::channel();
    let dashboard = DashboardBuilder::new(SimulatedArm::new())
        .config(config)
        .notifier(notifier)
        .build()?;
    Ok((dashboard, notifications))
}

/// 打印所有待处理通知
pub fn print_notifications(notifications: &Receiver<Notification>) {
    for notification in notifications.try_iter() {
        if notification.is_error() {
            eprintln!("❌ {}", notification.message);
        } else {
            println!("✅ {}", notification.message);
        }
    }
}

/// 打印关节状态表
pub fn print_joint_table(dashboard: &Dashboard<SimulatedArm>) {
    let snapshot = dashboard.stepper().snapshot();
    let stepper = dashboard.stepper();

    println!("  关节  使能  角度        校准");
    for joint in Joint::ALL {
        println!(
            "  {:<4}  {:<4}  {:<10}  {}",
            joint.name(),
            if snapshot.enabled[joint] { "ON" } else { "OFF" },
            stepper.display_angle(joint),
            snapshot.calibration[joint],
        );
    }
    println!(
        "  速度 {}  加速度 {}",
        snapshot.parameters.velocity, snapshot.parameters.acceleration
    );
}
