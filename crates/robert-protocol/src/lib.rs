//! # ROBERT Protocol
//!
//! 机械臂命令/事件边界的类型定义（无传输依赖）
//!
//! ## 模块
//!
//! - `joint`: 关节枚举、关节数组和角度限位
//! - `command`: 命令名称与各命令的参数结构
//! - `event`: 后端主动推送的事件（角度上报）
//! - `params`: 全局运动参数（速度/加速度）
//! - `phase`: 连接阶段和校准阶段
//!
//! ## 关节编号
//!
//! 本地状态使用 0-based 索引（`Joint::index()`），
//! 命令边界使用 1-based 编号（`Joint::wire_id()`，即 `J1..J6`）。

pub mod command;
pub mod error;
pub mod event;
pub mod joint;
pub mod params;
pub mod phase;

// 重新导出常用类型
pub use command::*;
pub use error::ProtocolError;
pub use event::{REPORT_STEPPERS_ANGLES, SteppersAnglesReport};
pub use joint::{Joint, JointArray, JointAngles};
pub use params::{MotionParameters, PARAMETER_MAX};
pub use phase::{CalibrationPhase, ConnectionPhase};
