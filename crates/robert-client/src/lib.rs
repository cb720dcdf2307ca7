//! # ROBERT Client
//!
//! 机械臂仪表盘的状态同步核心。
//!
//! ## 组件
//!
//! - [`CommandGateway`]: 命令边界上的类型化门面，唯一直接使用 [`Transport`] 的组件
//! - [`StepperState`]: 每个关节的使能/角度/校准阶段和全局运动参数
//! - [`ConnectionState`]: 串口选择与连接阶段，驱动关节状态的初始化和重置
//! - [`AngleReportSubscription`]: 与连接同生命周期的角度上报订阅
//! - [`PositionStore`]: `pos_<n>` 位置记录与回放
//! - [`script`]: 运动脚本解析与执行
//! - [`Dashboard`]: 一次性构造以上组件的入口
//!
//! ## 数据流
//!
//! ```text
//! UI ──► Dashboard ──► CommandGateway ──► Transport ──► 后端
//!            │               │                            │
//!            ▼               ▼                            │ report-steppers-angles
//!     ConnectionState ──► StepperState ◄── Subscription ◄─┘
//! ```
//!
//! [`SimulatedArm`] 在进程内实现整个命令边界，用于演示和测试。

pub mod config;
pub mod connection;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod positions;
pub mod script;
pub mod sim;
pub mod stepper;
pub mod subscription;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use connection::{ConnectionState, DEFAULT_PORT_LABEL, DEFAULT_PORT_VALUE, is_sentinel_port};
pub use dashboard::{Dashboard, DashboardBuilder};
pub use error::ClientError;
pub use gateway::{Ack, CommandGateway, GatewayError};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use positions::{JsonFileStore, KeyValueStore, MemoryStore, PositionStore, StoreError};
pub use script::{ParsedInstruction, ScriptCommand, ScriptError, ScriptRunner, parse_file, parse_script};
pub use sim::SimulatedArm;
pub use stepper::{Direction, StepperSettings, StepperSnapshot, StepperState, format_angle};
pub use subscription::AngleReportSubscription;
pub use transport::{BackendEvent, Transport};
