//! 客户端错误类型

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::positions::StoreError;
use crate::script::ScriptError;
use robert_protocol::ProtocolError;
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 没有活动连接
    #[error("Not connected to any port")]
    NotConnected,

    /// 命令网关错误（含后端拒绝）
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// 本地校验失败（例如角度超出限位）
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// 位置不存在
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    /// 位置存储失败
    #[error("Failed to store position")]
    StoreFailed,

    /// 存储介质错误
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 脚本错误
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// 是否已经作为错误通知投递
    ///
    /// 与后端交互产生的失败在发生时就会通知；本地校验错误只通过返回值报告。
    pub fn is_notified(&self) -> bool {
        matches!(
            self,
            ClientError::Gateway(_)
                | ClientError::StoreFailed
                | ClientError::Script(ScriptError::Step { .. })
        )
    }
}

/// 客户端操作结果
pub type Result<T> = std::result::Result<T, ClientError>;
