//! 设备常量定义

use std::time::Duration;

/// 默认 I2C 从机地址（7-bit）
pub const BASE_ADDRESS: u16 = 0x62;

/// 默认 I2C 重试次数
///
/// 设备经常丢失最初几次测量请求，因此重试次数高于一般设备。
pub const DEFAULT_RETRIES: u8 = 3;

/// 触发测量到读数有效之间的固定转换时间（100ms）
pub const CONVERSION_INTERVAL: Duration = Duration::from_millis(100);

/// 默认最小有效距离（米）
pub const MIN_DISTANCE: f32 = 0.20;

/// 默认最大有效距离（米）
pub const MAX_DISTANCE: f32 = 10.00;

/// 默认报告队列深度
pub const DEFAULT_QUEUE_DEPTH: usize = 2;

/// 报告队列深度下限（必须）
pub const MIN_QUEUE_DEPTH: usize = 1;

/// 报告队列深度上限（合理性检查）
pub const MAX_QUEUE_DEPTH: usize = 100;

/// 距离寄存器的单位换算：1 raw = 1 cm
pub const RAW_UNITS_PER_METER: f32 = 100.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_depth_bounds() {
        assert!(MIN_QUEUE_DEPTH <= DEFAULT_QUEUE_DEPTH);
        assert!(DEFAULT_QUEUE_DEPTH <= MAX_QUEUE_DEPTH);
    }

    #[test]
    fn test_default_range_is_ordered() {
        assert!(MIN_DISTANCE < MAX_DISTANCE);
        assert_eq!(CONVERSION_INTERVAL.as_micros(), 100_000);
    }
}
