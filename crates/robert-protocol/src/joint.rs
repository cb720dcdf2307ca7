//! 关节索引和数组
//!
//! 提供编译期安全的关节索引，防止越界和索引错误。
//!
//! # 示例
//!
//! ```rust
//! use robert_protocol::{Joint, JointArray};
//!
//! let angles: JointArray<Option<f64>> = JointArray::splat(None);
//! assert_eq!(angles[Joint::J1], None);
//!
//! // 命令边界使用 1-based 编号
//! assert_eq!(Joint::J3.wire_id(), 3);
//! assert_eq!(Joint::J2.angle_limit(), 100.0);
//! ```

use crate::error::ProtocolError;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// 关节枚举
///
/// 表示机械臂的 6 个关节。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Joint {
    /// 关节 1（基座旋转）
    J1 = 0,
    /// 关节 2（肩部）
    J2 = 1,
    /// 关节 3（肘部）
    J3 = 2,
    /// 关节 4（腕部旋转）
    J4 = 3,
    /// 关节 5（腕部俯仰）
    J5 = 4,
    /// 关节 6（末端旋转）
    J6 = 5,
}

/// 各关节最大角度（度），按 `Joint::index()` 排列
const ANGLE_LIMITS: [f64; 6] = [270.0, 100.0, 120.0, 270.0, 45.0, 360.0];

impl Joint {
    /// 所有关节的数组
    pub const ALL: [Joint; 6] = [
        Joint::J1,
        Joint::J2,
        Joint::J3,
        Joint::J4,
        Joint::J5,
        Joint::J6,
    ];

    /// 获取关节索引（0-5）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 命令边界上的关节编号（1-6）
    #[inline]
    pub const fn wire_id(self) -> u8 {
        self as u8 + 1
    }

    /// 从索引创建关节（范围检查）
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 从 1-based 编号创建关节
    pub fn from_wire_id(id: u8) -> Option<Self> {
        (id as usize).checked_sub(1).and_then(Self::from_index)
    }

    /// 获取关节名称
    pub const fn name(self) -> &'static str {
        match self {
            Joint::J1 => "J1",
            Joint::J2 => "J2",
            Joint::J3 => "J3",
            Joint::J4 => "J4",
            Joint::J5 => "J5",
            Joint::J6 => "J6",
        }
    }

    /// 最大可指令角度（度），有效区间为 `[0, angle_limit]`
    #[inline]
    pub const fn angle_limit(self) -> f64 {
        ANGLE_LIMITS[self as usize]
    }

    /// 检查角度是否在限位内
    pub fn check_angle(self, angle: f64) -> Result<f64, ProtocolError> {
        if !angle.is_finite() {
            return Err(ProtocolError::NonFiniteAngle { joint: self });
        }
        let limit = self.angle_limit();
        if !(0.0..=limit).contains(&angle) {
            return Err(ProtocolError::AngleOutOfRange {
                joint: self,
                angle,
                limit,
            });
        }
        Ok(angle)
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 解析 `J1`、`j1` 或 `1` 形式的关节编号
impl FromStr for Joint {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('J')
            .or_else(|| trimmed.strip_prefix('j'))
            .unwrap_or(trimmed);

        digits
            .parse::<u8>()
            .ok()
            .and_then(Joint::from_wire_id)
            .ok_or_else(|| ProtocolError::InvalidJoint(s.to_string()))
    }
}

/// 关节数组
///
/// 类型安全的 6 关节数组容器，支持索引、迭代和映射操作。
#[derive(Debug, Clone, PartialEq)]
pub struct JointArray<T> {
    data: [T; 6],
}

impl<T: Copy> Copy for JointArray<T> {}

impl<T> JointArray<T> {
    /// 创建新的关节数组
    #[inline]
    pub const fn new(data: [T; 6]) -> Self {
        JointArray { data }
    }

    /// 获取内部数组的引用
    #[inline]
    pub fn as_array(&self) -> &[T; 6] {
        &self.data
    }

    /// 迭代器
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// 带关节的迭代器
    pub fn iter_joints(&self) -> impl Iterator<Item = (Joint, &T)> {
        Joint::ALL.into_iter().zip(self.data.iter())
    }

    /// 映射转换
    pub fn map<U, F>(self, mut f: F) -> JointArray<U>
    where
        F: FnMut(T) -> U,
    {
        let [a, b, c, d, e, g] = self.data;
        JointArray::new([f(a), f(b), f(c), f(d), f(e), f(g)])
    }
}

impl<T: Copy> JointArray<T> {
    /// 创建所有元素相同的数组
    #[inline]
    pub const fn splat(value: T) -> Self {
        JointArray::new([value, value, value, value, value, value])
    }
}

impl<T: Default> Default for JointArray<T> {
    fn default() -> Self {
        JointArray::new(Default::default())
    }
}

impl<T> Index<Joint> for JointArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, joint: Joint) -> &T {
        &self.data[joint.index()]
    }
}

impl<T> IndexMut<Joint> for JointArray<T> {
    #[inline]
    fn index_mut(&mut self, joint: Joint) -> &mut T {
        &mut self.data[joint.index()]
    }
}

impl<T> From<[T; 6]> for JointArray<T> {
    #[inline]
    fn from(data: [T; 6]) -> Self {
        JointArray::new(data)
    }
}

impl<T> From<JointArray<T>> for [T; 6] {
    #[inline]
    fn from(arr: JointArray<T>) -> Self {
        arr.data
    }
}

impl<T> IntoIterator for JointArray<T> {
    type Item = T;
    type IntoIter = std::array::IntoIter<T, 6>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a JointArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// 关节角度（度），`None` 表示未知/尚未上报
pub type JointAngles = JointArray<Option<f64>>;
