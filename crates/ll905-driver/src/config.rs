//! 驱动配置

use crate::control::is_valid_queue_depth;
use crate::error::DriverError;
use ll905_protocol::{BASE_ADDRESS, DEFAULT_QUEUE_DEPTH, DEFAULT_RETRIES, MAX_DISTANCE, MIN_DISTANCE};

/// 驱动配置
///
/// # Example
///
/// ```
/// use ll905_driver::DriverConfig;
///
/// // 使用默认配置（0x62，3 次重试，队列深度 2，0.20-10.00 m）
/// let config = DriverConfig::default();
///
/// // 自定义配置
/// let config = DriverConfig {
///     queue_depth: 10,
///     max_distance: 6.0,
///     ..DriverConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriverConfig {
    /// I2C 从机地址（7-bit）
    pub address: u16,
    /// 总线重试次数（由传输层执行）
    pub retries: u8,
    /// 报告队列深度（1..=100）
    pub queue_depth: usize,
    /// 最小有效距离（米，开区间）
    pub min_distance: f32,
    /// 最大有效距离（米，开区间）
    pub max_distance: f32,
    /// 是否为主实例（只有主实例广播测距报告）
    pub primary: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: BASE_ADDRESS,
            retries: DEFAULT_RETRIES,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
            primary: true,
        }
    }
}

/// 距离阈值必须是非负有限值
pub(crate) fn check_distance(name: &str, value: f32) -> Result<(), DriverError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DriverError::InvalidArgument(format!(
            "{} must be a non-negative finite distance, got {}",
            name, value
        )))
    }
}

impl DriverConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), DriverError> {
        if !is_valid_queue_depth(self.queue_depth) {
            return Err(DriverError::InvalidArgument(format!(
                "queue depth {} outside 1..=100",
                self.queue_depth
            )));
        }
        if self.address > 0x7F {
            return Err(DriverError::InvalidArgument(format!(
                "address 0x{:X} is not a 7-bit address",
                self.address
            )));
        }
        check_distance("min_distance", self.min_distance)?;
        check_distance("max_distance", self.max_distance)?;
        Ok(())
    }
}
