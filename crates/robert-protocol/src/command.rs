//! 命令定义
//!
//! 每个后端命令对应一个命令名称和一个参数结构。参数以 camelCase
//! 字段名序列化，与命令边界约定一致（例如 `jointIndex`、`nSteps`）。

use crate::error::ProtocolError;
use crate::joint::Joint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 后端命令名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// 列出可用串口
    GetPorts,
    /// 连接到指定串口
    ConnectToPort,
    /// 断开当前连接
    DisconnectFromActiveConnection,
    /// 设置速度
    SetVelocity,
    /// 设置加速度
    SetAcceleration,
    /// 单关节相对步进
    MoveStep,
    /// 切换单关节使能
    ToggleStepper,
    /// 查询所有关节使能状态
    CheckSteppersState,
    /// 查询所有关节角度
    GetSteppersAngles,
    /// 查询运动参数
    GetParameters,
    /// 校准一组关节
    CalibrateSteppers,
    /// 驱动一组关节到绝对角度
    DriveSteppersToAngles,
}

impl CommandName {
    /// 所有命令
    pub const ALL: [CommandName; 12] = [
        CommandName::GetPorts,
        CommandName::ConnectToPort,
        CommandName::DisconnectFromActiveConnection,
        CommandName::SetVelocity,
        CommandName::SetAcceleration,
        CommandName::MoveStep,
        CommandName::ToggleStepper,
        CommandName::CheckSteppersState,
        CommandName::GetSteppersAngles,
        CommandName::GetParameters,
        CommandName::CalibrateSteppers,
        CommandName::DriveSteppersToAngles,
    ];

    /// 命令边界上的名称
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandName::GetPorts => "get_ports",
            CommandName::ConnectToPort => "connect_to_port",
            CommandName::DisconnectFromActiveConnection => "disconnect_from_active_connection",
            CommandName::SetVelocity => "set_velocity",
            CommandName::SetAcceleration => "set_acceleration",
            CommandName::MoveStep => "move_step",
            CommandName::ToggleStepper => "toggle_stepper",
            CommandName::CheckSteppersState => "check_steppers_state",
            CommandName::GetSteppersAngles => "get_steppers_angles",
            CommandName::GetParameters => "get_parameters",
            CommandName::CalibrateSteppers => "calibrate_steppers",
            CommandName::DriveSteppersToAngles => "drive_steppers_to_angles",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 关节使能状态（字符串载荷，而非布尔值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepperToggle {
    /// 电机驱动通电
    #[serde(rename = "ENABLED")]
    Enabled,
    /// 电机驱动断电
    #[serde(rename = "DISABLED")]
    Disabled,
}

impl StepperToggle {
    /// 从布尔值构造
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled {
            StepperToggle::Enabled
        } else {
            StepperToggle::Disabled
        }
    }

    /// 是否为使能
    pub const fn is_enabled(self) -> bool {
        matches!(self, StepperToggle::Enabled)
    }

    /// 字符串形式
    pub const fn as_str(self) -> &'static str {
        match self {
            StepperToggle::Enabled => "ENABLED",
            StepperToggle::Disabled => "DISABLED",
        }
    }
}

impl FromStr for StepperToggle {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ENABLED" => Ok(StepperToggle::Enabled),
            "DISABLED" => Ok(StepperToggle::Disabled),
            other => Err(ProtocolError::InvalidToggleState(other.to_string())),
        }
    }
}

/// 单关节绝对目标角度
///
/// 构造时检查限位，因此任何 `JointTarget` 都满足 `0 <= angle <= joint.angle_limit()`。
/// 序列化为 `(jointId, angle)` 二元组（1-based 编号）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "(u8, f64)", try_from = "(u8, f64)")]
pub struct JointTarget {
    joint: Joint,
    angle: f64,
}

impl JointTarget {
    /// 创建目标（带限位检查）
    pub fn new(joint: Joint, angle: f64) -> Result<Self, ProtocolError> {
        let angle = joint.check_angle(angle)?;
        Ok(Self { joint, angle })
    }

    /// 目标关节
    pub fn joint(&self) -> Joint {
        self.joint
    }

    /// 目标角度（度）
    pub fn angle(&self) -> f64 {
        self.angle
    }
}

impl From<JointTarget> for (u8, f64) {
    fn from(target: JointTarget) -> Self {
        (target.joint.wire_id(), target.angle)
    }
}

impl TryFrom<(u8, f64)> for JointTarget {
    type Error = ProtocolError;

    fn try_from((id, angle): (u8, f64)) -> Result<Self, Self::Error> {
        let joint =
            Joint::from_wire_id(id).ok_or_else(|| ProtocolError::InvalidJoint(id.to_string()))?;
        JointTarget::new(joint, angle)
    }
}

/// `connect_to_port` 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectArgs {
    pub port: String,
}

/// `set_velocity` 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityArgs {
    pub velocity: u8,
}

/// `set_acceleration` 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerationArgs {
    pub acceleration: u8,
}

/// `move_step` 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveStepArgs {
    /// 1-based 关节编号
    pub joint_index: u8,
    /// 相对步数（有符号）
    pub n_steps: i32,
}

/// `toggle_stepper` 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleArgs {
    /// 1-based 关节编号
    pub joint_index: u8,
    pub enabled: StepperToggle,
}

/// `calibrate_steppers` 参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrateArgs {
    /// 1-based 关节编号列表
    pub joints_indexes: Vec<u8>,
}

/// `drive_steppers_to_angles` 参数
///
/// 有序的 `(jointId, angle)` 列表，而不是映射。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveArgs {
    pub joints_angles: Vec<JointTarget>,
}
