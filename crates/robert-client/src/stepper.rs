//! 关节状态
//!
//! 维护每个关节的使能、角度和校准阶段，以及全局速度/加速度。
//!
//! # 一致性
//!
//! - 所有修改都经过本模块的方法，状态锁从不跨越 `.await`
//! - 后端推送的角度上报可能与初始化交错到达，以最后写入者为准
//! - 进行中的请求在完成时作用于当时的状态，不做取消

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gateway::{CommandGateway, GatewayError};
use crate::notify::Notifier;
use crate::transport::Transport;
use parking_lot::RwLock;
use robert_protocol::params::clamp_percent;
use robert_protocol::{
    CalibrationPhase, Joint, JointAngles, JointArray, MotionParameters, StepperToggle,
    SteppersAnglesReport,
};
use std::sync::Arc;

/// 关节状态快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepperSnapshot {
    /// 电机使能
    pub enabled: JointArray<bool>,
    /// 最近一次已知角度（度）
    pub angles: JointAngles,
    /// 校准阶段
    pub calibration: JointArray<CalibrationPhase>,
    /// 全局运动参数
    pub parameters: MotionParameters,
}

/// 关节状态的行为设置
#[derive(Debug, Clone, PartialEq)]
pub struct StepperSettings {
    /// 单次微调的步数
    pub increment_steps: i32,
    /// 使能切换失败时是否回滚
    pub rollback_toggle_on_failure: bool,
    /// "全部校准" 的关节集合
    pub calibrate_all: Vec<Joint>,
}

impl Default for StepperSettings {
    fn default() -> Self {
        Self {
            increment_steps: 10,
            rollback_toggle_on_failure: true,
            calibrate_all: vec![Joint::J1, Joint::J2, Joint::J3, Joint::J4],
        }
    }
}

impl TryFrom<&ClientConfig> for StepperSettings {
    type Error = ClientError;

    fn try_from(config: &ClientConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            increment_steps: config.stepper.increment_steps,
            rollback_toggle_on_failure: config.stepper.rollback_toggle_on_failure,
            calibrate_all: config.calibrate_all_joints()?,
        })
    }
}

/// 微调方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// 格式化角度：绝对值，保留两位小数，`°` 后缀；未知时为 `N/A`
pub fn format_angle(angle: Option<f64>) -> String {
    match angle {
        Some(angle) => {
            let rounded = (angle.abs() * 100.0).round() / 100.0;
            format!("{}°", rounded)
        },
        None => "N/A".to_string(),
    }
}

/// 关节状态句柄
///
/// 克隆后共享同一份状态。
pub struct StepperState<T> {
    gateway: Arc<CommandGateway<T>>,
    state: Arc<RwLock<StepperSnapshot>>,
    notifier: Notifier,
    settings: Arc<StepperSettings>,
}

impl<T> Clone for StepperState<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            state: Arc::clone(&self.state),
            notifier: self.notifier.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<T: Transport> StepperState<T> {
    pub fn new(
        gateway: Arc<CommandGateway<T>>,
        notifier: Notifier,
        settings: StepperSettings,
    ) -> Self {
        Self {
            gateway,
            state: Arc::new(RwLock::new(StepperSnapshot::default())),
            notifier,
            settings: Arc::new(settings),
        }
    }

    /// 当前状态的拷贝
    pub fn snapshot(&self) -> StepperSnapshot {
        self.state.read().clone()
    }

    pub fn enabled(&self, joint: Joint) -> bool {
        self.state.read().enabled[joint]
    }

    pub fn angle(&self, joint: Joint) -> Option<f64> {
        self.state.read().angles[joint]
    }

    pub fn angles(&self) -> JointAngles {
        self.state.read().angles
    }

    pub fn calibration(&self, joint: Joint) -> CalibrationPhase {
        self.state.read().calibration[joint]
    }

    pub fn parameters(&self) -> MotionParameters {
        self.state.read().parameters
    }

    pub fn settings(&self) -> &StepperSettings {
        &self.settings
    }

    /// 显示用角度字符串
    pub fn display_angle(&self, joint: Joint) -> String {
        format_angle(self.angle(joint))
    }

    /// 连接建立后的初始化
    ///
    /// 依次查询使能状态、角度和运动参数。每一步独立处理失败：
    /// 失败时发出错误通知，剩余步骤照常执行。
    pub async fn initialize_steppers_info(&self) {
        tracing::info!("initializing stepper state");

        if let Err(err) = self.refresh_states().await {
            self.notifier.error(err.to_string());
        }
        if let Err(err) = self.refresh_angles().await {
            self.notifier.error(err.to_string());
        }
        if let Err(err) = self.refresh_parameters().await {
            self.notifier.error(err.to_string());
        }
    }

    /// 从后端刷新使能状态
    pub async fn refresh_states(&self) -> Result<JointArray<bool>, GatewayError> {
        let enabled = self.gateway.check_steppers_state().await?;
        self.state.write().enabled = enabled;
        Ok(enabled)
    }

    /// 从后端刷新角度（按上报值原样保存）
    pub async fn refresh_angles(&self) -> Result<JointAngles, GatewayError> {
        let angles = self.gateway.get_steppers_angles().await?;
        self.state.write().angles = angles;
        Ok(angles)
    }

    /// 从后端刷新运动参数
    pub async fn refresh_parameters(&self) -> Result<MotionParameters, GatewayError> {
        let parameters = self.gateway.get_parameters().await?;
        self.state.write().parameters = parameters;
        Ok(parameters)
    }

    /// 切换单关节使能
    ///
    /// 在命令发出前就翻转本地状态。成功后刷新角度；失败时根据
    /// `rollback_toggle_on_failure` 决定是否回滚。
    pub async fn toggle_stepper(&self, joint: Joint) -> Result<bool, GatewayError> {
        let target = {
            let mut state = self.state.write();
            let target = !state.enabled[joint];
            state.enabled[joint] = target;
            target
        };

        let toggle = StepperToggle::from_enabled(target);
        match self.gateway.toggle_stepper(joint, toggle).await {
            Ok(_) => {
                tracing::info!("{} {}", joint, toggle.as_str());
                self.refresh_angles_or_notify().await;
                Ok(target)
            },
            Err(err) => {
                if self.settings.rollback_toggle_on_failure {
                    let mut state = self.state.write();
                    // 只有没被其它写入覆盖时才回滚
                    if state.enabled[joint] == target {
                        state.enabled[joint] = !target;
                    }
                }
                self.notifier.error(err.to_string());
                Err(err)
            },
        }
    }

    /// 校准单个关节
    pub async fn handle_calibrate(&self, joint: Joint) -> Result<(), GatewayError> {
        self.calibrate(&[joint]).await
    }

    /// 校准配置中的关节集合（默认 J1..J4）
    pub async fn handle_calibrate_all(&self) -> Result<(), GatewayError> {
        let joints = self.settings.calibrate_all.clone();
        self.calibrate(&joints).await
    }

    async fn calibrate(&self, joints: &[Joint]) -> Result<(), GatewayError> {
        self.set_calibration(joints, CalibrationPhase::Calibrating);

        match self.gateway.calibrate_steppers(joints).await {
            Ok(_) => {
                self.set_calibration(joints, CalibrationPhase::Calibrated);
                self.notifier
                    .success(format!("Calibrated {}", join_joints(joints)));
                self.refresh_angles_or_notify().await;
                Ok(())
            },
            Err(err) => {
                self.set_calibration(joints, CalibrationPhase::NotCalibrated);
                self.notifier.error(err.to_string());
                Err(err)
            },
        }
    }

    /// 设置速度
    ///
    /// 本地值立即更新（限幅后），失败时不回退。
    pub async fn set_velocity(&self, velocity: i64) -> Result<(), GatewayError> {
        self.state.write().parameters.velocity = clamp_percent(velocity);
        self.gateway
            .set_velocity(velocity)
            .await
            .map(|_| ())
            .inspect_err(|err| self.notifier.error(err.to_string()))
    }

    /// 设置加速度
    pub async fn set_acceleration(&self, acceleration: i64) -> Result<(), GatewayError> {
        self.state.write().parameters.acceleration = clamp_percent(acceleration);
        self.gateway
            .set_acceleration(acceleration)
            .await
            .map(|_| ())
            .inspect_err(|err| self.notifier.error(err.to_string()))
    }

    /// 按配置的步数微调单个关节
    pub async fn nudge(&self, joint: Joint, direction: Direction) -> Result<(), GatewayError> {
        self.move_steps(joint, direction.sign() * self.settings.increment_steps)
            .await
    }

    /// 单关节相对步进
    pub async fn move_steps(&self, joint: Joint, n_steps: i32) -> Result<(), GatewayError> {
        self.gateway
            .move_step(joint, n_steps)
            .await
            .map(|_| ())
            .inspect_err(|err| self.notifier.error(err.to_string()))
    }

    /// 重置为断开状态：全部未使能、角度未知、未校准
    ///
    /// 运动参数保持不变。
    pub fn reset_stepper_state(&self) {
        let mut state = self.state.write();
        state.enabled = JointArray::splat(false);
        state.angles = JointArray::splat(None);
        state.calibration = JointArray::splat(CalibrationPhase::NotCalibrated);
        tracing::debug!("stepper state reset");
    }

    /// 写入一次角度上报（整体替换，取绝对值）
    pub fn apply_angle_report(&self, report: &SteppersAnglesReport) {
        let angles = report.to_joint_array().map(|angle| angle.map(f64::abs));
        self.state.write().angles = angles;
    }

    fn set_calibration(&self, joints: &[Joint], phase: CalibrationPhase) {
        let mut state = self.state.write();
        for &joint in joints {
            state.calibration[joint] = phase;
        }
    }

    async fn refresh_angles_or_notify(&self) {
        if let Err(err) = self.refresh_angles().await {
            self.notifier.error(err.to_string());
        }
    }
}

fn join_joints(joints: &[Joint]) -> String {
    joints
        .iter()
        .map(|joint| joint.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedArm;
    use robert_protocol::CommandName;

    fn stepper() -> (SimulatedArm, StepperState<SimulatedArm>) {
        let arm = SimulatedArm::new();
        arm.force_connected("/dev/ttyACM0");
        let gateway = Arc::new(CommandGateway::new(arm.clone()));
        let state = StepperState::new(gateway, Notifier::silent(), StepperSettings::default());
        (arm, state)
    }

    #[test]
    fn test_format_angle() {
        assert_eq!(format_angle(Some(-45.0)), "45°");
        assert_eq!(format_angle(Some(12.346)), "12.35°");
        assert_eq!(format_angle(Some(0.1)), "0.1°");
        assert_eq!(format_angle(None), "N/A");
    }

    #[test]
    fn test_apply_angle_report_takes_absolute_values() {
        let (_, state) = stepper();
        state.apply_angle_report(&SteppersAnglesReport {
            j3: Some(-45.0),
            ..Default::default()
        });

        assert_eq!(state.angle(Joint::J3), Some(45.0));
        assert_eq!(state.angle(Joint::J1), None);
        assert_eq!(state.display_angle(Joint::J3), "45°");
    }

    #[tokio::test]
    async fn test_reset_keeps_parameters() {
        let (_, state) = stepper();
        state.initialize_steppers_info().await;
        state.set_velocity(80).await.unwrap();
        state.reset_stepper_state();

        let snapshot = state.snapshot();
        assert!(snapshot.enabled.iter().all(|e| !e));
        assert!(snapshot.angles.iter().all(Option::is_none));
        assert_eq!(snapshot.parameters.velocity, 80);
    }

    #[tokio::test]
    async fn test_parameters_are_not_reverted_on_failure() {
        let (arm, state) = stepper();
        arm.reject(CommandName::SetAcceleration, "Timeout while waiting for response");

        assert!(state.set_acceleration(150).await.is_err());
        assert_eq!(state.parameters().acceleration, 100);
    }

    #[tokio::test]
    async fn test_nudge_uses_increment() {
        let (arm, state) = stepper();
        state.nudge(Joint::J2, Direction::Backward).await.ok();

        let call = &arm.calls()[0];
        assert_eq!(call.command, CommandName::MoveStep);
        assert_eq!(call.args["nSteps"], -10);
        assert_eq!(call.args["jointIndex"], 2);
    }
}
