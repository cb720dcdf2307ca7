//! 命令网关
//!
//! 命令边界之上的类型化门面：每个后端命令一个方法。每个方法：
//!
//! 1. 同步检查必需参数（缺失时返回 [`GatewayError::MissingArgument`]，不发起调用）
//! 2. 把参数编组为 JSON
//! 3. 原样返回后端的类型化响应
//! 4. 后端拒绝统一转换为 [`GatewayError::Rejected`]
//!
//! 网关本身不发通知，也不修改任何状态；由调用方决定如何处理失败。

use crate::transport::Transport;
use robert_protocol::params::clamp_percent;
use robert_protocol::{
    AccelerationArgs, CalibrateArgs, CommandName, ConnectArgs, DriveArgs, Joint, JointAngles,
    JointArray, JointTarget, MotionParameters, MoveStepArgs, ProtocolError, StepperToggle,
    ToggleArgs, VelocityArgs,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// 后端确认（内容不做解释）
pub type Ack = Value;

/// 网关错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    /// 必需参数缺失（本地检测，未发起调用）
    #[error("{command}: {argument} must be provided")]
    MissingArgument {
        command: CommandName,
        argument: &'static str,
    },

    /// 后端拒绝
    #[error("{message}")]
    Rejected {
        command: CommandName,
        message: String,
    },

    /// 响应无法解码
    #[error("{command}: unexpected response: {source}")]
    Decode {
        command: CommandName,
        #[source]
        source: serde_json::Error,
    },

    /// 参数编组失败
    #[error("{command}: failed to encode arguments: {source}")]
    Encode {
        command: CommandName,
        #[source]
        source: serde_json::Error,
    },

    /// 响应违反协议约定
    #[error("{command}: {source}")]
    Protocol {
        command: CommandName,
        #[source]
        source: ProtocolError,
    },
}

impl GatewayError {
    /// 出错的命令
    pub fn command(&self) -> CommandName {
        match self {
            GatewayError::MissingArgument { command, .. }
            | GatewayError::Rejected { command, .. }
            | GatewayError::Decode { command, .. }
            | GatewayError::Encode { command, .. }
            | GatewayError::Protocol { command, .. } => *command,
        }
    }

    /// 是否为后端拒绝
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Rejected { .. })
    }
}

/// 命令网关
pub struct CommandGateway<T> {
    transport: T,
}

impl<T: Transport> CommandGateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// 底层传输
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<A, R>(&self, command: CommandName, args: Option<&A>) -> Result<R, GatewayError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = match args {
            Some(args) => serde_json::to_value(args)
                .map_err(|source| GatewayError::Encode { command, source })?,
            None => Value::Object(Map::new()),
        };

        tracing::debug!(%command, %args, "invoke");

        let response = self
            .transport
            .invoke(command, args)
            .await
            .map_err(|message| {
                tracing::warn!(%command, %message, "command rejected");
                GatewayError::Rejected { command, message }
            })?;

        serde_json::from_value(response).map_err(|source| GatewayError::Decode { command, source })
    }

    /// 列出可用串口
    pub async fn get_ports(&self) -> Result<Vec<String>, GatewayError> {
        self.call::<(), _>(CommandName::GetPorts, None).await
    }

    /// 连接到串口，返回状态消息
    pub async fn connect_to_port(&self, port: &str) -> Result<Vec<String>, GatewayError> {
        let command = CommandName::ConnectToPort;
        if port.trim().is_empty() {
            return Err(GatewayError::MissingArgument {
                command,
                argument: "port",
            });
        }
        let args = ConnectArgs {
            port: port.to_string(),
        };
        self.call(command, Some(&args)).await
    }

    /// 断开当前连接
    pub async fn disconnect_from_active_connection(&self) -> Result<Vec<String>, GatewayError> {
        self.call::<(), _>(CommandName::DisconnectFromActiveConnection, None)
            .await
    }

    /// 设置速度（发送前限幅到 0-100）
    pub async fn set_velocity(&self, velocity: i64) -> Result<Ack, GatewayError> {
        let args = VelocityArgs {
            velocity: clamp_percent(velocity),
        };
        self.call(CommandName::SetVelocity, Some(&args)).await
    }

    /// 设置加速度（发送前限幅到 0-100）
    pub async fn set_acceleration(&self, acceleration: i64) -> Result<Ack, GatewayError> {
        let args = AccelerationArgs {
            acceleration: clamp_percent(acceleration),
        };
        self.call(CommandName::SetAcceleration, Some(&args)).await
    }

    /// 单关节相对步进
    pub async fn move_step(&self, joint: Joint, n_steps: i32) -> Result<Ack, GatewayError> {
        let args = MoveStepArgs {
            joint_index: joint.wire_id(),
            n_steps,
        };
        self.call(CommandName::MoveStep, Some(&args)).await
    }

    /// 切换单关节使能
    pub async fn toggle_stepper(
        &self,
        joint: Joint,
        enabled: StepperToggle,
    ) -> Result<Ack, GatewayError> {
        let args = ToggleArgs {
            joint_index: joint.wire_id(),
            enabled,
        };
        self.call(CommandName::ToggleStepper, Some(&args)).await
    }

    /// 查询所有关节使能状态
    pub async fn check_steppers_state(&self) -> Result<JointArray<bool>, GatewayError> {
        let command = CommandName::CheckSteppersState;
        let states: Vec<bool> = self.call::<(), _>(command, None).await?;
        into_joint_array(command, states)
    }

    /// 查询所有关节角度
    pub async fn get_steppers_angles(&self) -> Result<JointAngles, GatewayError> {
        let command = CommandName::GetSteppersAngles;
        let angles: Vec<Option<f64>> = self.call::<(), _>(command, None).await?;
        into_joint_array(command, angles)
    }

    /// 查询运动参数
    pub async fn get_parameters(&self) -> Result<MotionParameters, GatewayError> {
        let command = CommandName::GetParameters;
        let values: Vec<f64> = self.call::<(), _>(command, None).await?;
        MotionParameters::from_wire(&values)
            .map_err(|source| GatewayError::Protocol { command, source })
    }

    /// 校准一组关节
    pub async fn calibrate_steppers(&self, joints: &[Joint]) -> Result<Ack, GatewayError> {
        let command = CommandName::CalibrateSteppers;
        if joints.is_empty() {
            return Err(GatewayError::MissingArgument {
                command,
                argument: "jointsIndexes",
            });
        }
        let args = CalibrateArgs {
            joints_indexes: joints.iter().map(|j| j.wire_id()).collect(),
        };
        self.call(command, Some(&args)).await
    }

    /// 驱动一组关节到绝对角度
    ///
    /// 目标在构造 [`JointTarget`] 时已完成限位检查。
    pub async fn drive_steppers_to_angles(
        &self,
        targets: &[JointTarget],
    ) -> Result<Ack, GatewayError> {
        let command = CommandName::DriveSteppersToAngles;
        if targets.is_empty() {
            return Err(GatewayError::MissingArgument {
                command,
                argument: "jointsAngles",
            });
        }
        let args = DriveArgs {
            joints_angles: targets.to_vec(),
        };
        self.call(command, Some(&args)).await
    }
}

fn into_joint_array<V>(command: CommandName, values: Vec<V>) -> Result<JointArray<V>, GatewayError> {
    let actual = values.len();
    let data: [V; 6] = values.try_into().map_err(|_| GatewayError::Protocol {
        command,
        source: ProtocolError::InvalidLength {
            expected: 6,
            actual,
        },
    })?;
    Ok(JointArray::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedArm;
    use serde_json::json;

    fn connected_gateway() -> CommandGateway<SimulatedArm> {
        let arm = SimulatedArm::new();
        arm.force_connected("/dev/ttyACM0");
        CommandGateway::new(arm)
    }

    #[tokio::test]
    async fn test_missing_arguments_do_not_reach_backend() {
        let gateway = connected_gateway();

        let err = gateway.calibrate_steppers(&[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingArgument { argument: "jointsIndexes", .. }));

        let err = gateway.drive_steppers_to_angles(&[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingArgument { .. }));

        let err = gateway.connect_to_port("  ").await.unwrap_err();
        assert_eq!(err.command(), CommandName::ConnectToPort);

        assert!(gateway.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_velocity_is_clamped_before_dispatch() {
        let gateway = connected_gateway();
        gateway.set_velocity(250).await.unwrap();
        gateway.set_acceleration(-3).await.unwrap();

        let calls = gateway.transport().calls();
        assert_eq!(calls[0].args, json!({ "velocity": 100 }));
        assert_eq!(calls[1].args, json!({ "acceleration": 0 }));
    }

    #[tokio::test]
    async fn test_toggle_uses_one_based_ids_and_string_state() {
        let gateway = connected_gateway();
        gateway
            .toggle_stepper(Joint::J3, StepperToggle::Enabled)
            .await
            .unwrap();

        let call = &gateway.transport().calls()[0];
        assert_eq!(call.command, CommandName::ToggleStepper);
        assert_eq!(call.args, json!({ "jointIndex": 3, "enabled": "ENABLED" }));
    }

    #[tokio::test]
    async fn test_rejection_carries_backend_message() {
        let gateway = connected_gateway();
        gateway
            .transport()
            .reject(CommandName::GetParameters, "Timeout while waiting for response");

        let err = gateway.get_parameters().await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Timeout while waiting for response");
    }

    #[tokio::test]
    async fn test_short_state_response_is_protocol_error() {
        let gateway = connected_gateway();
        gateway
            .transport()
            .override_response(CommandName::CheckSteppersState, json!([true, false]));

        let err = gateway.check_steppers_state().await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Protocol {
                source: ProtocolError::InvalidLength { expected: 6, actual: 2 },
                ..
            }
        ));
    }
}
