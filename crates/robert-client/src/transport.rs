//! 命令边界抽象
//!
//! 一次命令 = 一次往返。参数和返回值都是 JSON 值，
//! 后端拒绝以人类可读的字符串返回。
//!
//! 后端推送的事件通过广播通道分发，订阅方自行按事件名过滤。

use robert_protocol::CommandName;
use serde_json::Value;
use std::future::Future;
use tokio::sync::broadcast;

/// 后端推送事件
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    /// 事件名称（如 `report-steppers-angles`）
    pub name: String,
    /// 事件载荷
    pub payload: Value,
}

impl BackendEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// 后端传输
///
/// 实现方负责把命令送达后端并返回原始响应。
/// 除 [`CommandGateway`](crate::gateway::CommandGateway) 外，任何组件都不直接使用传输。
pub trait Transport: Send + Sync + 'static {
    /// 调用命令
    ///
    /// `Err` 携带后端给出的拒绝原因。
    fn invoke(
        &self,
        command: CommandName,
        args: Value,
    ) -> impl Future<Output = Result<Value, String>> + Send;

    /// 订阅后端推送事件
    fn subscribe(&self) -> broadcast::Receiver<BackendEvent>;
}
