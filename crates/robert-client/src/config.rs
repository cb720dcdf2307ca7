//! 客户端配置
//!
//! TOML 格式，所有字段都有默认值，缺失的段落按默认值补全：
//!
//! ```toml
//! [stepper]
//! increment_steps = 10
//! rollback_toggle_on_failure = true
//!
//! [calibration]
//! all_joints = [1, 2, 3, 4]
//!
//! [storage]
//! positions_file = "/home/user/.local/share/robert/positions.json"
//! ```

use robert_protocol::Joint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// 关节相关配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// 单次微调的步数
    pub increment_steps: i32,
    /// 使能切换失败时是否回滚乐观更新
    pub rollback_toggle_on_failure: bool,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            increment_steps: 10,
            rollback_toggle_on_failure: true,
        }
    }
}

/// 校准配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// "全部校准" 包含的关节（1-based）
    pub all_joints: Vec<u8>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            all_joints: vec![1, 2, 3, 4],
        }
    }
}

/// 位置存储配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 位置文件；未设置时只保存在内存中
    pub positions_file: Option<PathBuf>,
}

/// 客户端配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub stepper: StepperConfig,
    pub calibration: CalibrationConfig,
    pub storage: StorageConfig,
}

impl ClientConfig {
    /// 从文件加载；文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    /// 保存到文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.to_toml_string()?).map_err(write_err)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stepper.increment_steps <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "stepper.increment_steps",
                reason: format!("must be positive, got {}", self.stepper.increment_steps),
            });
        }
        self.calibrate_all_joints().map(|_| ())
    }

    /// "全部校准" 的关节集合（去重，保持配置顺序）
    pub fn calibrate_all_joints(&self) -> Result<Vec<Joint>, ConfigError> {
        if self.calibration.all_joints.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "calibration.all_joints",
                reason: "must not be empty".to_string(),
            });
        }

        let mut joints = Vec::with_capacity(self.calibration.all_joints.len());
        for &id in &self.calibration.all_joints {
            let joint = Joint::from_wire_id(id).ok_or_else(|| ConfigError::InvalidValue {
                key: "calibration.all_joints",
                reason: format!("joint id {} is outside 1..=6", id),
            })?;
            if !joints.contains(&joint) {
                joints.push(joint);
            }
        }
        Ok(joints)
    }
}

impl std::str::FromStr for ClientConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}
