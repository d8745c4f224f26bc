//! 采样率控制
//!
//! 定义采样率请求的编码，以及采样率与采样间隔之间的换算。

use crate::error::DriverError;
use ll905_protocol::{CONVERSION_INTERVAL, MAX_QUEUE_DEPTH, MIN_QUEUE_DEPTH};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 采样率请求
///
/// # 模式说明
///
/// - **Manual**: 停止周期采集，`read` 时同步执行一次测量
/// - **Default / Max**: 以最快合法速率采集（间隔 = 转换时间）
/// - **External**: 外部信号触发（设备不支持，始终拒绝）
/// - **Hz(n)**: 以 n Hz 采集，间隔小于转换时间时拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollRate {
    Manual,
    Default,
    Max,
    External,
    Hz(u32),
}

impl PollRate {
    /// 最大合法采样率（Hz）
    pub const MAX_HZ: u32 = (1_000_000 / CONVERSION_INTERVAL.as_micros()) as u32;

    /// 换算为采样间隔
    ///
    /// # 返回
    /// - `Ok(None)`: 手动模式
    /// - `Ok(Some(interval))`: 周期模式
    ///
    /// # 错误
    /// - `DriverError::InvalidArgument`: External、0 Hz、或间隔小于转换时间
    pub fn interval(self) -> Result<Option<Duration>, DriverError> {
        match self {
            PollRate::Manual => Ok(None),
            PollRate::Default | PollRate::Max => Ok(Some(CONVERSION_INTERVAL)),
            PollRate::External => Err(DriverError::InvalidArgument(
                "external signalling is not supported".to_string(),
            )),
            PollRate::Hz(0) => Err(DriverError::InvalidArgument(
                "poll rate must be non-zero".to_string(),
            )),
            PollRate::Hz(hz) => {
                let interval = Duration::from_micros(1_000_000 / u64::from(hz));
                if interval < CONVERSION_INTERVAL {
                    return Err(DriverError::InvalidArgument(format!(
                        "{} Hz exceeds the maximum rate of {} Hz",
                        hz,
                        Self::MAX_HZ
                    )));
                }
                Ok(Some(interval))
            },
        }
    }

    /// 由当前采样间隔还原采样率（零间隔为手动模式）
    pub fn from_interval(interval: Duration) -> Self {
        let us = interval.as_micros() as u64;
        if us == 0 {
            return PollRate::Manual;
        }
        PollRate::Hz((1_000_000 / us) as u32)
    }
}

impl fmt::Display for PollRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollRate::Manual => write!(f, "manual"),
            PollRate::Default => write!(f, "default"),
            PollRate::Max => write!(f, "max"),
            PollRate::External => write!(f, "external"),
            PollRate::Hz(hz) => write!(f, "{} Hz", hz),
        }
    }
}

impl FromStr for PollRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(PollRate::Manual),
            "default" => Ok(PollRate::Default),
            "max" => Ok(PollRate::Max),
            "external" => Ok(PollRate::External),
            other => other
                .trim_end_matches("hz")
                .trim()
                .parse::<u32>()
                .map(PollRate::Hz)
                .map_err(|_| format!("invalid poll rate '{}'", s)),
        }
    }
}

/// 检查队列深度是否在 1..=100
pub fn is_valid_queue_depth(depth: usize) -> bool {
    (MIN_QUEUE_DEPTH..=MAX_QUEUE_DEPTH).contains(&depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_hz() {
        assert_eq!(PollRate::MAX_HZ, 10);
    }

    #[test]
    fn test_interval_for_modes() {
        assert_eq!(PollRate::Manual.interval().unwrap(), None);
        assert_eq!(
            PollRate::Default.interval().unwrap(),
            Some(CONVERSION_INTERVAL)
        );
        assert_eq!(PollRate::Max.interval().unwrap(), Some(CONVERSION_INTERVAL));
        assert_eq!(
            PollRate::Hz(2).interval().unwrap(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            PollRate::Hz(10).interval().unwrap(),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_rejected_rates() {
        assert!(matches!(
            PollRate::External.interval(),
            Err(DriverError::InvalidArgument(_))
        ));
        assert!(matches!(
            PollRate::Hz(0).interval(),
            Err(DriverError::InvalidArgument(_))
        ));
        assert!(matches!(
            PollRate::Hz(11).interval(),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_round_trip_effective_interval() {
        for hz in 1..=PollRate::MAX_HZ {
            let interval = PollRate::Hz(hz).interval().unwrap().unwrap();
            let back = PollRate::from_interval(interval);
            assert_eq!(back.interval().unwrap(), Some(interval), "{} Hz", hz);
        }
        assert_eq!(PollRate::from_interval(Duration::ZERO), PollRate::Manual);
        assert_eq!(
            PollRate::from_interval(CONVERSION_INTERVAL),
            PollRate::Hz(10)
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("manual".parse::<PollRate>().unwrap(), PollRate::Manual);
        assert_eq!("Default".parse::<PollRate>().unwrap(), PollRate::Default);
        assert_eq!("5".parse::<PollRate>().unwrap(), PollRate::Hz(5));
        assert_eq!("2Hz".parse::<PollRate>().unwrap(), PollRate::Hz(2));
        assert!("fast".parse::<PollRate>().is_err());
    }

    #[test]
    fn test_queue_depth_validation() {
        assert!(!is_valid_queue_depth(0));
        assert!(is_valid_queue_depth(1));
        assert!(is_valid_queue_depth(100));
        assert!(!is_valid_queue_depth(101));
    }
}
