//! 用户可见通知
//!
//! 所有后端调用失败都在调用方被转换为一条短暂通知，而不会让进程崩溃。
//! 通知同时写入 tracing 日志。

use crossbeam_channel::{Receiver, Sender, unbounded};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// 一条通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    /// 是否为错误通知
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// 通知发送端
///
/// 可以廉价克隆，所有状态容器共享同一个通知通道。
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<Sender<Notification>>,
}

impl Notifier {
    /// 创建通知通道
    pub fn channel() -> (Notifier, Receiver<Notification>) {
        let (tx, rx) = unbounded();
        (Notifier { tx: Some(tx) }, rx)
    }

    /// 仅记录日志，不投递通知
    pub fn silent() -> Self {
        Notifier { tx: None }
    }

    /// 成功通知
    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.send(NotificationLevel::Success, message);
    }

    /// 错误通知
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.send(NotificationLevel::Error, message);
    }

    fn send(&self, level: NotificationLevel, message: String) {
        if let Some(tx) = &self.tx {
            // 接收端已关闭时丢弃
            let _ = tx.send(Notification { level, message });
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::silent()
    }
}
