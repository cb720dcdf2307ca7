//! 连接阶段和校准阶段

use std::fmt;

/// 连接阶段
///
/// ```text
/// NotProbed ──► Probing ──► Accepted ──► NotProbed
///                  │    ▲
///                  ▼    │ (重试)
///                Refused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// 尚未尝试连接
    #[default]
    NotProbed,
    /// 正在握手
    Probing,
    /// 后端接受连接
    Accepted,
    /// 后端拒绝连接
    Refused,
}

impl ConnectionPhase {
    /// 是否存在可用的命令通道
    #[inline]
    pub const fn is_connected(self) -> bool {
        matches!(self, ConnectionPhase::Accepted)
    }

    /// 状态指示灯颜色
    pub const fn indicator_color(self) -> &'static str {
        match self {
            ConnectionPhase::Refused => "#FD0200",
            ConnectionPhase::Accepted => "#69B59E",
            ConnectionPhase::NotProbed => "#6B7280",
            ConnectionPhase::Probing => "#EA580C",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionPhase::NotProbed => "NOT_PROBED",
            ConnectionPhase::Probing => "PROBING",
            ConnectionPhase::Accepted => "ACCEPTED",
            ConnectionPhase::Refused => "REFUSED",
        };
        f.write_str(s)
    }
}

/// 关节校准阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationPhase {
    #[default]
    NotCalibrated,
    Calibrating,
    Calibrated,
}

impl CalibrationPhase {
    /// 状态指示灯颜色（固定三色）
    pub const fn indicator_color(self) -> &'static str {
        match self {
            CalibrationPhase::NotCalibrated => "#6B7280",
            CalibrationPhase::Calibrating => "#EA580C",
            CalibrationPhase::Calibrated => "#69B59E",
        }
    }
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalibrationPhase::NotCalibrated => "NOT_CALIBRATED",
            CalibrationPhase::Calibrating => "CALIBRATING",
            CalibrationPhase::Calibrated => "CALIBRATED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_accepted_is_connected() {
        assert!(ConnectionPhase::Accepted.is_connected());
        assert!(!ConnectionPhase::NotProbed.is_connected());
        assert!(!ConnectionPhase::Probing.is_connected());
        assert!(!ConnectionPhase::Refused.is_connected());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ConnectionPhase::default(), ConnectionPhase::NotProbed);
        assert_eq!(CalibrationPhase::default(), CalibrationPhase::NotCalibrated);
        assert_eq!(ConnectionPhase::Refused.indicator_color(), "#FD0200");
    }
}
