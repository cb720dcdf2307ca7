//! 全局运动参数

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// 速度/加速度上限（百分比刻度）
pub const PARAMETER_MAX: u8 = 100;

/// 全局运动参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionParameters {
    /// 速度，0-100
    pub velocity: u8,
    /// 加速度，0-100
    pub acceleration: u8,
}

impl MotionParameters {
    /// 创建参数（自动限幅）
    pub fn new(velocity: i64, acceleration: i64) -> Self {
        Self {
            velocity: clamp_percent(velocity),
            acceleration: clamp_percent(acceleration),
        }
    }

    /// 从 `get_parameters` 响应（`[velocity, acceleration]`）解析
    pub fn from_wire(values: &[f64]) -> Result<Self, ProtocolError> {
        match values {
            [velocity, acceleration] => Ok(Self::new(
                velocity.round() as i64,
                acceleration.round() as i64,
            )),
            other => Err(ProtocolError::InvalidLength {
                expected: 2,
                actual: other.len(),
            }),
        }
    }
}

/// 限幅到 `[0, PARAMETER_MAX]`
#[inline]
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, PARAMETER_MAX as i64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_wire() {
        assert_eq!(
            MotionParameters::from_wire(&[50.0, 20.0]),
            Ok(MotionParameters {
                velocity: 50,
                acceleration: 20
            })
        );
        assert_eq!(
            MotionParameters::from_wire(&[150.0, -5.0]),
            Ok(MotionParameters {
                velocity: 100,
                acceleration: 0
            })
        );
        assert!(MotionParameters::from_wire(&[1.0]).is_err());
    }

    proptest! {
        #[test]
        fn prop_clamp_percent_in_range(value in any::<i64>()) {
            let clamped = clamp_percent(value);
            prop_assert!(clamped <= PARAMETER_MAX);
            if (0..=100).contains(&value) {
                prop_assert_eq!(clamped as i64, value);
            }
        }
    }
}
