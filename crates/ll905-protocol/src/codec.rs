//! 命令构建与距离解码
//!
//! 所有函数都是纯函数，不会失败。

use crate::constants::RAW_UNITS_PER_METER;
use crate::registers::{MeasureValue, Register};

/// 构建"开始测量"命令：`[测量寄存器, 触发值]`
pub fn encode_measure_command() -> [u8; 2] {
    [Register::Measure.into(), MeasureValue::Acquire.into()]
}

/// 构建复位命令：`[测量寄存器, 复位值]`
///
/// 设备收到后从 Flash 重新加载 FPGA，所有寄存器恢复默认值。
pub fn encode_reset_command() -> [u8; 2] {
    [Register::Measure.into(), MeasureValue::ResetFpga.into()]
}

/// 构建距离读取的寄存器选择字节（随后读取 2 字节）
pub fn encode_distance_request() -> [u8; 1] {
    [Register::DistanceHigh.into()]
}

/// 解码距离寄存器对
///
/// 大端 16-bit 无符号数，单位为厘米，返回米。
pub fn decode_distance(raw: [u8; 2]) -> f32 {
    f32::from(u16::from_be_bytes(raw)) / RAW_UNITS_PER_METER
}

/// 将厘米值编码为距离寄存器对（用于设备仿真）
pub fn encode_distance_raw(centimeters: u16) -> [u8; 2] {
    centimeters.to_be_bytes()
}

/// 判断距离是否落在有效范围内（两端均为开区间）
pub fn is_within_range(distance: f32, min_distance: f32, max_distance: f32) -> bool {
    distance > min_distance && distance < max_distance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_measure_command_bytes() {
        assert_eq!(encode_measure_command(), [0x00, 0x04]);
    }

    #[test]
    fn test_reset_command_bytes() {
        assert_eq!(encode_reset_command(), [0x00, 0x00]);
    }

    #[test]
    fn test_distance_request_bytes() {
        assert_eq!(encode_distance_request(), [0x8F]);
    }

    #[test]
    fn test_decode_distance() {
        assert_close(decode_distance([0x00, 0x0A]), 0.10);
        assert_close(decode_distance([0x03, 0xE8]), 10.00);
        assert_eq!(decode_distance([0x00, 0x00]), 0.0);
        // 最大值：655.35 m
        assert_close(decode_distance([0xFF, 0xFF]), 655.35);
    }

    #[test]
    fn test_decode_exact_upper_bound() {
        // 1000 cm 必须精确解码为 10.0，否则开区间比较会出错
        assert_eq!(decode_distance([0x03, 0xE8]), 10.0);
    }

    #[test]
    fn test_encode_distance_raw() {
        assert_eq!(encode_distance_raw(10), [0x00, 0x0A]);
        assert_eq!(decode_distance(encode_distance_raw(250)), 2.5);
    }

    #[test]
    fn test_validity_window() {
        assert!(!is_within_range(0.10, 0.20, 10.00));
        assert!(is_within_range(5.00, 0.20, 10.00));
        // 上下界均为开区间
        assert!(!is_within_range(10.00, 0.20, 10.00));
        assert!(!is_within_range(0.20, 0.20, 10.00));
    }
}
