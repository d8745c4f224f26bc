//! CLI 配置文件
//!
//! ```toml
//! bus = 1
//! address = 0x62
//! retries = 3
//! queue_depth = 10
//! min_distance = 0.2
//! max_distance = 8.0
//! ```

use anyhow::{Context, Result};
use ll905_driver::{DEFAULT_I2C_BUS, DriverConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 配置文件路径
fn config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("ll905");
    path.push("config.toml");
    Some(path)
}

/// CLI 配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// I2C 总线编号
    pub bus: u32,

    /// 驱动配置（地址、重试、队列深度、距离阈值）
    #[serde(flatten)]
    pub driver: DriverConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            bus: DEFAULT_I2C_BUS,
            driver: DriverConfig::default(),
        }
    }
}

impl CliConfig {
    /// 从默认位置加载，文件不存在时使用默认配置
    pub fn load_default() -> Result<Self> {
        match config_file() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// 从指定文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        config
            .driver
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bus = 3").unwrap();
        writeln!(file, "queue_depth = 12").unwrap();
        writeln!(file, "max_distance = 6.5").unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.bus, 3);
        assert_eq!(config.driver.queue_depth, 12);
        assert_eq!(config.driver.max_distance, 6.5);
        // 未指定的字段使用默认值
        assert_eq!(config.driver.address, 0x62);
        assert_eq!(config.driver.retries, 3);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(CliConfig::load(file.path()).unwrap(), CliConfig::default());
    }

    #[test]
    fn test_invalid_queue_depth_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_depth = 500").unwrap();
        assert!(CliConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_malformed_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bus = \"one\"").unwrap();
        assert!(CliConfig::load(file.path()).is_err());
    }
}
