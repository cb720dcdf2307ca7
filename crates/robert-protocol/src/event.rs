//! 后端推送事件
//!
//! 后端在每次计算出关节角度后主动推送 `report-steppers-angles`，
//! 不需要应答，也不与任何请求关联。

use crate::joint::{Joint, JointAngles, JointArray};
use serde::{Deserialize, Serialize};

/// 角度上报事件名称
pub const REPORT_STEPPERS_ANGLES: &str = "report-steppers-angles";

/// 角度上报载荷
///
/// 六个命名字段，每个关节一个，`None` 表示角度未知。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteppersAnglesReport {
    pub j1: Option<f64>,
    pub j2: Option<f64>,
    pub j3: Option<f64>,
    pub j4: Option<f64>,
    pub j5: Option<f64>,
    pub j6: Option<f64>,
}

impl SteppersAnglesReport {
    /// 读取某个关节的上报值
    pub fn get(&self, joint: Joint) -> Option<f64> {
        self.to_joint_array()[joint]
    }

    /// 转换为关节数组
    pub fn to_joint_array(&self) -> JointAngles {
        JointArray::new([self.j1, self.j2, self.j3, self.j4, self.j5, self.j6])
    }
}

impl From<JointAngles> for SteppersAnglesReport {
    fn from(angles: JointAngles) -> Self {
        let [j1, j2, j3, j4, j5, j6] = angles.into();
        Self {
            j1,
            j2,
            j3,
            j4,
            j5,
            j6,
        }
    }
}
