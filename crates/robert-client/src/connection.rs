//! 连接状态
//!
//! 管理选中的串口、连接阶段和可用串口列表，负责所有连接/断开转换：
//!
//! ```text
//! NotProbed ──connect──► Probing ──ok──► Accepted ──disconnect──► NotProbed
//!                           │
//!                           └──err──► Refused ──connect──► Probing
//! ```
//!
//! 连接被接受后启动角度上报订阅并初始化关节状态；断开时在任何退出路径上
//! 都会释放订阅并重置关节状态。

use crate::error::{ClientError, Result};
use crate::gateway::CommandGateway;
use crate::notify::Notifier;
use crate::stepper::StepperState;
use crate::subscription::AngleReportSubscription;
use crate::transport::Transport;
use parking_lot::{Mutex, RwLock};
use robert_protocol::ConnectionPhase;
use std::sync::Arc;

/// 未选择串口时显示的标签
pub const DEFAULT_PORT_LABEL: &str = "Select a port";

/// 未选择串口时下拉框的取值
pub const DEFAULT_PORT_VALUE: &str = "default";

/// 是否为"未选择"哨兵值
pub fn is_sentinel_port(candidate: &str) -> bool {
    let candidate = candidate.trim();
    candidate.is_empty() || candidate == DEFAULT_PORT_LABEL || candidate == DEFAULT_PORT_VALUE
}

#[derive(Debug, Clone)]
struct ConnectionSession {
    selected_port: String,
    phase: ConnectionPhase,
    available_ports: Vec<String>,
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self {
            selected_port: DEFAULT_PORT_LABEL.to_string(),
            phase: ConnectionPhase::NotProbed,
            available_ports: Vec::new(),
        }
    }
}

/// 退出作用域时重置关节状态
struct ResetOnExit<'a, T: Transport>(&'a StepperState<T>);

impl<T: Transport> Drop for ResetOnExit<'_, T> {
    fn drop(&mut self) {
        self.0.reset_stepper_state();
    }
}

/// 连接状态句柄
///
/// 克隆后共享同一个会话。
pub struct ConnectionState<T> {
    gateway: Arc<CommandGateway<T>>,
    session: Arc<RwLock<ConnectionSession>>,
    stepper: StepperState<T>,
    subscription: Arc<Mutex<Option<AngleReportSubscription>>>,
    notifier: Notifier,
}

impl<T> Clone for ConnectionState<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            session: Arc::clone(&self.session),
            stepper: self.stepper.clone(),
            subscription: Arc::clone(&self.subscription),
            notifier: self.notifier.clone(),
        }
    }
}

impl<T: Transport> ConnectionState<T> {
    pub fn new(
        gateway: Arc<CommandGateway<T>>,
        stepper: StepperState<T>,
        notifier: Notifier,
    ) -> Self {
        Self {
            gateway,
            session: Arc::new(RwLock::new(ConnectionSession::default())),
            stepper,
            subscription: Arc::new(Mutex::new(None)),
            notifier,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.session.read().phase
    }

    /// 是否已连接（等价于 `phase() == Accepted`）
    pub fn is_connected(&self) -> bool {
        self.phase().is_connected()
    }

    /// 当前选中的串口（未选择时为 `None`）
    pub fn selected_port(&self) -> Option<String> {
        let session = self.session.read();
        (!is_sentinel_port(&session.selected_port)).then(|| session.selected_port.clone())
    }

    /// 下拉框显示的串口标签
    pub fn selected_port_label(&self) -> String {
        self.session.read().selected_port.clone()
    }

    pub fn available_ports(&self) -> Vec<String> {
        self.session.read().available_ports.clone()
    }

    pub fn stepper(&self) -> &StepperState<T> {
        &self.stepper
    }

    /// 角度上报订阅是否在运行
    pub fn is_listening(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(AngleReportSubscription::is_active)
    }

    /// 要求存在活动连接
    pub fn require_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// 仅修改本地选择
    pub fn set_port(&self, candidate: &str) {
        let label = if is_sentinel_port(candidate) {
            DEFAULT_PORT_LABEL
        } else {
            candidate
        };
        self.session.write().selected_port = label.to_string();
    }

    /// 从后端刷新可用串口；失败时保留原列表
    pub async fn refresh_ports(&self) -> Result<Vec<String>> {
        match self.gateway.get_ports().await {
            Ok(ports) => {
                tracing::debug!("found {} ports", ports.len());
                self.session.write().available_ports = ports.clone();
                Ok(ports)
            },
            Err(err) => {
                self.notifier.error(err.to_string());
                Err(err.into())
            },
        }
    }

    /// 连接到串口
    ///
    /// 哨兵值（`"Select a port"`、`"default"`）不做任何事。
    pub async fn connect_to_port(&self, candidate: &str) -> Result<()> {
        if is_sentinel_port(candidate) {
            tracing::debug!("ignoring connect to sentinel port {:?}", candidate);
            return Ok(());
        }

        let was_connected = {
            let mut session = self.session.write();
            let was_connected = session.phase.is_connected();
            session.selected_port = candidate.to_string();
            session.phase = ConnectionPhase::Probing;
            was_connected
        };
        // 旧连接的订阅不再有效
        self.subscription.lock().take();
        tracing::info!("connecting to {}", candidate);

        match self.gateway.connect_to_port(candidate).await {
            Ok(messages) => {
                self.session.write().phase = ConnectionPhase::Accepted;
                let message = if messages.is_empty() {
                    format!("Connected to {}", candidate)
                } else {
                    messages.join(" ")
                };
                self.notifier.success(message);

                let subscription =
                    AngleReportSubscription::start(self.gateway.transport(), self.stepper.clone());
                *self.subscription.lock() = Some(subscription);

                self.stepper.initialize_steppers_info().await;
                Ok(())
            },
            Err(err) => {
                self.session.write().phase = ConnectionPhase::Refused;
                if was_connected {
                    self.stepper.reset_stepper_state();
                }
                self.notifier.error(err.to_string());
                Err(err.into())
            },
        }
    }

    /// 断开当前连接
    ///
    /// 无活动连接时不做任何事。无论后端是否成功，连接标志都会清除，
    /// 关节状态都会重置。
    pub async fn disconnect_port(&self) -> Result<()> {
        if !self.is_connected() {
            tracing::debug!("disconnect requested without an active connection");
            return Ok(());
        }

        let _reset = ResetOnExit(&self.stepper);
        self.subscription.lock().take();

        let result = self.gateway.disconnect_from_active_connection().await;
        self.session.write().phase = ConnectionPhase::NotProbed;

        match result {
            Ok(messages) => {
                let message = if messages.is_empty() {
                    "Disconnected".to_string()
                } else {
                    messages.join(" ")
                };
                self.notifier.success(message);
                Ok(())
            },
            Err(err) => {
                self.notifier.error(err.to_string());
                Err(err.into())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedArm;
    use crate::stepper::StepperSettings;

    fn connection(arm: &SimulatedArm) -> ConnectionState<SimulatedArm> {
        let gateway = Arc::new(CommandGateway::new(arm.clone()));
        let stepper = StepperState::new(
            Arc::clone(&gateway),
            Notifier::silent(),
            StepperSettings::default(),
        );
        ConnectionState::new(gateway, stepper, Notifier::silent())
    }

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel_port("Select a port"));
        assert!(is_sentinel_port("default"));
        assert!(is_sentinel_port(""));
        assert!(!is_sentinel_port("/dev/ttyACM0"));
    }

    #[test]
    fn test_set_port_is_local() {
        let arm = SimulatedArm::new();
        let conn = connection(&arm);

        assert_eq!(conn.selected_port(), None);
        assert_eq!(conn.selected_port_label(), DEFAULT_PORT_LABEL);

        conn.set_port("COM3");
        assert_eq!(conn.selected_port().as_deref(), Some("COM3"));
        assert_eq!(conn.phase(), ConnectionPhase::NotProbed);
        assert!(arm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refused_keeps_attempted_port() {
        let arm = SimulatedArm::new();
        let conn = connection(&arm);

        assert!(conn.connect_to_port("COM9").await.is_err());
        assert_eq!(conn.phase(), ConnectionPhase::Refused);
        assert_eq!(conn.selected_port().as_deref(), Some("COM9"));
        assert!(conn.require_connected().is_err());
        assert!(!conn.is_listening());
    }

    #[tokio::test]
    async fn test_refresh_ports_failure_keeps_list() {
        let arm = SimulatedArm::new();
        let conn = connection(&arm);

        let ports = conn.refresh_ports().await.unwrap();
        assert_eq!(ports.len(), 2);

        arm.reject(robert_protocol::CommandName::GetPorts, "enumeration failed");
        assert!(conn.refresh_ports().await.is_err());
        assert_eq!(conn.available_ports(), ports);
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_noop() {
        let arm = SimulatedArm::new();
        let conn = connection(&arm);

        conn.disconnect_port().await.unwrap();
        assert!(arm.calls().is_empty());
    }
}
