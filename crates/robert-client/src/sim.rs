//! 模拟机械臂后端
//!
//! 在进程内实现完整的命令边界，用于 CLI 演示和测试：
//!
//! - 端口列表、连接/断开握手
//! - 每个关节的使能、角度、校准状态
//! - 角度变化后推送 `report-steppers-angles`
//! - 可注入的拒绝、响应覆盖和调用延迟
//! - 调用记录（用于断言命令边界上的载荷）

use crate::transport::{BackendEvent, Transport};
use parking_lot::Mutex;
use robert_protocol::{
    AccelerationArgs, CalibrateArgs, CommandName, ConnectArgs, DriveArgs, Joint, JointAngles,
    JointArray, MotionParameters, MoveStepArgs, REPORT_STEPPERS_ANGLES, SteppersAnglesReport,
    ToggleArgs, VelocityArgs,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// 每个关节的每步角度（度）
const DEGREES_PER_STEP: [f64; 6] = [1.8, 0.35, 1.8, 1.8, 0.9, 1.8];

/// 每个关节的减速比
const REDUCTION_RATIOS: [f64; 6] = [
    100.0 / 16.0,
    80.0 / 16.0,
    100.0 / 16.0,
    60.0 / 16.0,
    32.0 / 16.0,
    1.0,
];

/// 事件通道容量
const EVENT_CAPACITY: usize = 64;

/// 调用记录上限，超出后丢弃最早的记录
pub const CALL_LOG_CAPACITY: usize = 256;

/// 一次记录的命令调用
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: CommandName,
    pub args: Value,
}

#[derive(Debug)]
struct ArmModel {
    ports: Vec<String>,
    active_port: Option<String>,
    enabled: JointArray<bool>,
    angles: JointAngles,
    parameters: MotionParameters,
    rejections: HashMap<CommandName, String>,
    overrides: HashMap<CommandName, Value>,
    calls: VecDeque<RecordedCall>,
    latency: Duration,
}

impl Default for ArmModel {
    fn default() -> Self {
        Self {
            ports: vec!["/dev/ttyACM0".to_string(), "/dev/ttyUSB0".to_string()],
            active_port: None,
            enabled: JointArray::splat(false),
            angles: JointArray::splat(None),
            parameters: MotionParameters::new(50, 50),
            rejections: HashMap::new(),
            overrides: HashMap::new(),
            calls: VecDeque::new(),
            latency: Duration::ZERO,
        }
    }
}

/// 模拟机械臂
///
/// 克隆后共享同一个模型。
#[derive(Clone)]
pub struct SimulatedArm {
    model: Arc<Mutex<ArmModel>>,
    events: broadcast::Sender<BackendEvent>,
}

impl SimulatedArm {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            model: Arc::new(Mutex::new(ArmModel::default())),
            events,
        }
    }

    /// 跳过握手，直接进入已连接状态
    pub fn force_connected(&self, port: &str) {
        self.model.lock().active_port = Some(port.to_string());
    }

    /// 当前连接的端口
    pub fn active_port(&self) -> Option<String> {
        self.model.lock().active_port.clone()
    }

    /// 令某个命令持续返回拒绝，直到调用 [`accept`](Self::accept)
    pub fn reject(&self, command: CommandName, message: impl Into<String>) {
        self.model.lock().rejections.insert(command, message.into());
    }

    /// 取消对某个命令的拒绝
    pub fn accept(&self, command: CommandName) {
        self.model.lock().rejections.remove(&command);
    }

    /// 用固定值覆盖某个命令的响应
    pub fn override_response(&self, command: CommandName, response: Value) {
        self.model.lock().overrides.insert(command, response);
    }

    /// 每次调用前的模拟延迟
    pub fn set_latency(&self, latency: Duration) {
        self.model.lock().latency = latency;
    }

    /// 设置关节角度（不推送事件）
    pub fn set_angles(&self, angles: JointAngles) {
        self.model.lock().angles = angles;
    }

    /// 当前模型中的关节角度
    pub fn angles(&self) -> JointAngles {
        self.model.lock().angles
    }

    /// 当前模型中的使能状态
    pub fn enabled(&self) -> JointArray<bool> {
        self.model.lock().enabled
    }

    /// 当前模型中的运动参数
    pub fn parameters(&self) -> MotionParameters {
        self.model.lock().parameters
    }

    /// 最近的调用记录（最多 [`CALL_LOG_CAPACITY`] 条）
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.model.lock().calls.iter().cloned().collect()
    }

    /// 某个命令被调用的次数
    pub fn call_count(&self, command: CommandName) -> usize {
        self.model
            .lock()
            .calls
            .iter()
            .filter(|call| call.command == command)
            .count()
    }

    /// 清空调用记录
    pub fn clear_calls(&self) {
        self.model.lock().calls.clear();
    }

    /// 主动推送一次角度上报
    pub fn emit_angles(&self, report: SteppersAnglesReport) {
        let payload = match serde_json::to_value(report) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("failed to encode angle report: {}", err);
                return;
            },
        };
        // 没有订阅者时 send 返回错误，忽略即可
        let _ = self
            .events
            .send(BackendEvent::new(REPORT_STEPPERS_ANGLES, payload));
    }

    fn report_current_angles(&self, angles: JointAngles) {
        self.emit_angles(SteppersAnglesReport::from(angles));
    }

    fn handle(&self, command: CommandName, args: Value) -> Result<Value, String> {
        let mut model = self.model.lock();

        if let Some(message) = model.rejections.get(&command) {
            return Err(message.clone());
        }
        if let Some(response) = model.overrides.get(&command) {
            return Ok(response.clone());
        }

        match command {
            CommandName::GetPorts => Ok(json!(model.ports)),

            CommandName::ConnectToPort => {
                let ConnectArgs { port } = parse_args(command, args)?;
                if !model.ports.contains(&port) {
                    return Err(format!(
                        "Failed to connect to port: {}. Error: device not found",
                        port
                    ));
                }
                model.active_port = Some(port.clone());
                Ok(json!([format!("Successfully connected to port: {}.", port)]))
            },

            CommandName::DisconnectFromActiveConnection => match model.active_port.take() {
                Some(port) => Ok(json!([format!("Disconnected from port: {}.", port)])),
                None => Err(no_connection()),
            },

            _ if model.active_port.is_none() => Err(no_connection()),

            CommandName::SetVelocity => {
                let VelocityArgs { velocity } = parse_args(command, args)?;
                model.parameters.velocity = velocity;
                Ok(json!(["OK"]))
            },

            CommandName::SetAcceleration => {
                let AccelerationArgs { acceleration } = parse_args(command, args)?;
                model.parameters.acceleration = acceleration;
                Ok(json!(["OK"]))
            },

            CommandName::MoveStep => {
                let MoveStepArgs {
                    joint_index,
                    n_steps,
                } = parse_args(command, args)?;
                let joint = wire_joint(joint_index)?;
                if !model.enabled[joint] {
                    return Err(format!("Stepper {} is disabled", joint));
                }
                if let Some(angle) = model.angles[joint].as_mut() {
                    let i = joint.index();
                    *angle += n_steps as f64 * DEGREES_PER_STEP[i] / REDUCTION_RATIOS[i];
                }
                let angles = model.angles;
                drop(model);
                self.report_current_angles(angles);
                Ok(json!(["OK"]))
            },

            CommandName::ToggleStepper => {
                let ToggleArgs {
                    joint_index,
                    enabled,
                } = parse_args(command, args)?;
                let joint = wire_joint(joint_index)?;
                model.enabled[joint] = enabled.is_enabled();
                Ok(json!([format!("{}_{}", joint, enabled.as_str())]))
            },

            CommandName::CheckSteppersState => Ok(json!(model.enabled.as_array())),

            CommandName::GetSteppersAngles => {
                let angles = model.angles;
                drop(model);
                self.report_current_angles(angles);
                Ok(json!(angles.as_array()))
            },

            CommandName::GetParameters => Ok(json!([
                model.parameters.velocity,
                model.parameters.acceleration
            ])),

            CommandName::CalibrateSteppers => {
                let CalibrateArgs { joints_indexes } = parse_args(command, args)?;
                let joints = joints_indexes
                    .into_iter()
                    .map(wire_joint)
                    .collect::<Result<Vec<_>, _>>()?;
                for joint in joints {
                    model.angles[joint] = Some(0.0);
                }
                let angles = model.angles;
                drop(model);
                self.report_current_angles(angles);
                Ok(json!(["[CALIBRATION];OK"]))
            },

            CommandName::DriveSteppersToAngles => {
                let DriveArgs { joints_angles } = parse_args(command, args)?;
                for target in &joints_angles {
                    if model.angles[target.joint()].is_none() {
                        return Err(format!(
                            "Current angle for {} is unknown",
                            target.joint()
                        ));
                    }
                }
                for target in joints_angles {
                    model.angles[target.joint()] = Some(target.angle());
                }
                let angles = model.angles;
                drop(model);
                self.report_current_angles(angles);
                Ok(json!(["OK"]))
            },
        }
    }
}

impl Default for SimulatedArm {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedArm {
    fn invoke(
        &self,
        command: CommandName,
        args: Value,
    ) -> impl Future<Output = Result<Value, String>> + Send {
        let arm = self.clone();
        async move {
            let latency = {
                let mut model = arm.model.lock();
                if model.calls.len() == CALL_LOG_CAPACITY {
                    model.calls.pop_front();
                }
                model.calls.push_back(RecordedCall {
                    command,
                    args: args.clone(),
                });
                model.latency
            };
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            arm.handle(command, args)
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }
}

fn no_connection() -> String {
    "No serial connection available".to_string()
}

fn wire_joint(id: u8) -> Result<Joint, String> {
    Joint::from_wire_id(id).ok_or_else(|| format!("Invalid Joint: {}", id))
}

fn parse_args<A: DeserializeOwned>(command: CommandName, args: Value) -> Result<A, String> {
    serde_json::from_value(args)
        .map_err(|err| format!("{}: command was not properly formatted: {}", command, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_log_is_bounded() {
        let arm = SimulatedArm::new();
        arm.force_connected("/dev/ttyACM0");
        for velocity in 0..(CALL_LOG_CAPACITY + 10) {
            arm.invoke(CommandName::SetVelocity, json!({ "velocity": velocity % 100 }))
                .await
                .unwrap();
        }

        let calls = arm.calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        // 最早的 10 条被丢弃
        assert_eq!(calls[0].args, json!({ "velocity": 10 }));
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let arm = SimulatedArm::new();
        let err = arm
            .invoke(CommandName::CheckSteppersState, json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, "No serial connection available");

        arm.invoke(CommandName::ConnectToPort, json!({ "port": "/dev/ttyACM0" }))
            .await
            .unwrap();
        assert_eq!(arm.active_port().as_deref(), Some("/dev/ttyACM0"));
        assert!(
            arm.invoke(CommandName::CheckSteppersState, json!({}))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_unknown_port_is_refused() {
        let arm = SimulatedArm::new();
        let err = arm
            .invoke(CommandName::ConnectToPort, json!({ "port": "COM9" }))
            .await
            .unwrap_err();
        assert!(err.contains("COM9"));
        assert_eq!(arm.active_port(), None);
    }

    #[tokio::test]
    async fn test_calibration_zeroes_and_reports() {
        let arm = SimulatedArm::new();
        arm.force_connected("/dev/ttyACM0");
        let mut events = arm.subscribe();

        arm.invoke(
            CommandName::CalibrateSteppers,
            json!({ "jointsIndexes": [1, 2] }),
        )
        .await
        .unwrap();

        assert_eq!(arm.angles()[Joint::J1], Some(0.0));
        assert_eq!(arm.angles()[Joint::J3], None);

        let event = events.try_recv().unwrap();
        assert_eq!(event.name, REPORT_STEPPERS_ANGLES);
        assert_eq!(event.payload["j2"], json!(0.0));
    }

    #[tokio::test]
    async fn test_drive_requires_known_angle() {
        let arm = SimulatedArm::new();
        arm.force_connected("/dev/ttyACM0");

        let err = arm
            .invoke(
                CommandName::DriveSteppersToAngles,
                json!({ "jointsAngles": [[1, 10.0]] }),
            )
            .await
            .unwrap_err();
        assert_eq!(err, "Current angle for J1 is unknown");
    }

    #[tokio::test]
    async fn test_move_step_on_enabled_joint() {
        let arm = SimulatedArm::new();
        arm.force_connected("/dev/ttyACM0");
        let mut angles = JointArray::splat(None);
        angles[Joint::J4] = Some(0.0);
        arm.set_angles(angles);

        // 未使能时拒绝
        assert!(
            arm.invoke(CommandName::MoveStep, json!({ "jointIndex": 4, "nSteps": 10 }))
                .await
                .is_err()
        );

        arm.invoke(
            CommandName::ToggleStepper,
            json!({ "jointIndex": 4, "enabled": "ENABLED" }),
        )
        .await
        .unwrap();
        arm.invoke(CommandName::MoveStep, json!({ "jointIndex": 4, "nSteps": 10 }))
            .await
            .unwrap();

        let angle = arm.angles()[Joint::J4].unwrap();
        assert!((angle - 4.8).abs() < 1e-9, "angle = {}", angle);
    }
}
