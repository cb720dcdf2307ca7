//! 配置管理命令
//!
//! 读取、检查和初始化客户端配置文件

use anyhow::{Context, Result};
use clap::Subcommand;
use robert_client::ClientConfig;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("robert");
    path.push("config.toml");
    Ok(path)
}

/// 默认位置文件（`<data_dir>/robert/positions.json`）
pub fn default_positions_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("robert").join("positions.json"))
}

/// 命令行参数优先，否则使用默认路径
pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_config_file(),
    }
}

/// 加载配置（文件不存在时使用默认值）
///
/// 未配置位置文件时使用数据目录下的默认文件，位置在多次运行之间保留。
pub fn load(path: &Path) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path)
        .with_context(|| format!("加载配置失败: {}", path.display()))?;
    if config.storage.positions_file.is_none() {
        config.storage.positions_file = default_positions_file();
        if config.storage.positions_file.is_none() {
            tracing::warn!("no data directory, positions are kept in memory");
        }
    }
    Ok(config)
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 获取配置项
    Get {
        /// 配置项名称（如 stepper.increment_steps）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,

    /// 写入默认配置文件
    Init {
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Get { key } => Self::get_(path, &key),

            ConfigCommand::Check => Self::check_(path),

            ConfigCommand::Init { force } => Self::init_(path, force),
        }
    }

    fn get_(path: &Path, key: &str) -> Result<()> {
        let config = load(path)?;
        println!("{}", lookup(&config, key)?);
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        println!("配置文件: {}", path.display());
        if !path.exists() {
            println!("  (文件不存在，使用默认配置)");
        }

        let config = load(path)?;
        let joints = config.calibrate_all_joints()?;

        println!("  微调步数: {}", config.stepper.increment_steps);
        println!(
            "  切换失败回滚: {}",
            if config.stepper.rollback_toggle_on_failure { "是" } else { "否" }
        );
        println!(
            "  全部校准: {}",
            joints.iter().map(|j| j.name()).collect::<Vec<_>>().join(", ")
        );
        match &config.storage.positions_file {
            Some(file) => println!("  位置文件: {}", file.display()),
            None => println!("  位置文件: (仅内存)"),
        }
        println!("✅ 配置有效");
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        ClientConfig::default().save(path).context("写入配置文件失败")?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}

/// 按点分路径读取配置项
fn lookup(config: &ClientConfig, key: &str) -> Result<String> {
    let value = match key {
        "all" => return Ok(config.to_toml_string()?),
        "stepper.increment_steps" => config.stepper.increment_steps.to_string(),
        "stepper.rollback_toggle_on_failure" => {
            config.stepper.rollback_toggle_on_failure.to_string()
        },
        "calibration.all_joints" => format!("{:?}", config.calibration.all_joints),
        "storage.positions_file" => match &config.storage.positions_file {
            Some(file) => file.display().to_string(),
            None => "(未设置)".to_string(),
        },
        other => anyhow::bail!("未知配置项: {}", other),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_keys() {
        let config = ClientConfig::default();
        assert_eq!(lookup(&config, "stepper.increment_steps").unwrap(), "10");
        assert_eq!(lookup(&config, "calibration.all_joints").unwrap(), "[1, 2, 3, 4]");
        assert_eq!(lookup(&config, "storage.positions_file").unwrap(), "(未设置)");
        assert!(lookup(&config, "interface").is_err());
        assert!(lookup(&config, "all").unwrap().contains("[stepper]"));
    }

    #[test]
    fn test_load_fills_in_positions_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = load(&path).unwrap();
        assert_eq!(config.storage.positions_file, default_positions_file());

        let explicit = dir.path().join("mine.json");
        std::fs::write(
            &path,
            format!("[storage]\npositions_file = {:?}\n", explicit.display().to_string()),
        )
        .unwrap();
        assert_eq!(load(&path).unwrap().storage.positions_file, Some(explicit));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_path(Some(PathBuf::from("/tmp/robert.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/robert.toml"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        ConfigCommand::Init { force: false }.execute(&path).unwrap();
        assert!(ConfigCommand::Init { force: false }.execute(&path).is_err());
        ConfigCommand::Init { force: true }.execute(&path).unwrap();
    }
}
