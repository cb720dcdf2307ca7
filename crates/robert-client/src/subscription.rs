//! 角度上报订阅
//!
//! 订阅的生命周期与连接绑定：连接被接受时创建，断开或重连时丢弃。
//! 丢弃即终止后台任务，之后到达的上报不会再写入关节状态。

use crate::stepper::StepperState;
use crate::transport::Transport;
use robert_protocol::{REPORT_STEPPERS_ANGLES, SteppersAnglesReport};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// 角度上报订阅句柄
#[derive(Debug)]
pub struct AngleReportSubscription {
    task: JoinHandle<()>,
}

impl AngleReportSubscription {
    /// 开始监听 `report-steppers-angles`
    ///
    /// 在调用返回前就已完成订阅，不会漏掉之后推送的事件。
    /// 必须在 tokio 运行时内调用。
    pub fn start<T: Transport>(transport: &T, stepper: StepperState<T>) -> Self {
        let mut events = transport.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.name == REPORT_STEPPERS_ANGLES => {
                        match serde_json::from_value::<SteppersAnglesReport>(event.payload) {
                            Ok(report) => stepper.apply_angle_report(&report),
                            Err(err) => tracing::warn!("malformed angle report: {}", err),
                        }
                    },
                    Ok(_) => {},
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("angle report listener lagged, skipped {} events", skipped);
                    },
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("angle report listener stopped");
        });

        tracing::debug!("angle report listener started");
        Self { task }
    }

    /// 后台任务是否仍在运行
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AngleReportSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CommandGateway;
    use crate::notify::Notifier;
    use crate::sim::SimulatedArm;
    use crate::stepper::StepperSettings;
    use robert_protocol::Joint;
    use std::sync::Arc;
    use std::time::Duration;

    fn stepper(arm: &SimulatedArm) -> StepperState<SimulatedArm> {
        let gateway = Arc::new(CommandGateway::new(arm.clone()));
        StepperState::new(gateway, Notifier::silent(), StepperSettings::default())
    }

    #[tokio::test]
    async fn test_reports_flow_into_stepper_state() {
        let arm = SimulatedArm::new();
        let state = stepper(&arm);
        let _subscription = AngleReportSubscription::start(&arm, state.clone());

        arm.emit_angles(SteppersAnglesReport {
            j3: Some(-45.0),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(state.display_angle(Joint::J3), "45°");
    }

    #[tokio::test]
    async fn test_dropped_subscription_ignores_reports() {
        let arm = SimulatedArm::new();
        let state = stepper(&arm);
        let subscription = AngleReportSubscription::start(&arm, state.clone());
        assert!(subscription.is_active());
        drop(subscription);

        arm.emit_angles(SteppersAnglesReport {
            j1: Some(10.0),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(state.angle(Joint::J1), None);
    }
}
