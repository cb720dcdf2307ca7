//! 协议层错误类型定义

use crate::joint::Joint;
use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 无效的关节编号（1-based 或 `J<n>` 形式）
    #[error("Invalid joint: {0}")]
    InvalidJoint(String),

    /// 目标角度超出关节限位
    #[error("Target angle {angle} exceeds joint limits for {joint} (0..={limit})")]
    AngleOutOfRange {
        /// 关节
        joint: Joint,
        /// 目标角度（度）
        angle: f64,
        /// 限位（度）
        limit: f64,
    },

    /// 角度为 NaN 或无穷大
    #[error("Angle for {joint} is not a finite number")]
    NonFiniteAngle {
        /// 关节
        joint: Joint,
    },

    /// 无效的使能状态字符串
    #[error("Invalid stepper state: {0}")]
    InvalidToggleState(String),

    /// 响应长度不符
    #[error("Invalid response length: expected {expected}, got {actual}")]
    InvalidLength {
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },
}
