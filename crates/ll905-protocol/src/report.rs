//! 测距报告与子系统状态消息

use crate::codec::is_within_range;

/// 测距传感器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorType {
    /// 激光测距
    #[default]
    Laser,
}

/// 测距报告
///
/// 每次 collect 成功生成一份，写入报告队列并（主实例）广播。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeFinderReport {
    /// 采样时刻（单调时钟，微秒）
    pub timestamp_us: u64,
    /// 距离（米）
    pub distance: f32,
    /// 距离是否在 `(min_distance, max_distance)` 内
    pub valid: bool,
    /// 采样时累计的通信错误数
    pub error_count: u64,
    /// 传感器类型
    pub sensor_type: SensorType,
}

impl RangeFinderReport {
    /// 根据当前阈值构建报告，`valid` 在此时计算
    pub fn new(
        timestamp_us: u64,
        distance: f32,
        min_distance: f32,
        max_distance: f32,
        error_count: u64,
    ) -> Self {
        Self {
            timestamp_us,
            distance,
            valid: is_within_range(distance, min_distance, max_distance),
            error_count,
            sensor_type: SensorType::Laser,
        }
    }
}

/// 子系统类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubsystemKind {
    RangeFinder,
}

/// 子系统存在性通知（每次启动采集时广播）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubsystemInfo {
    pub present: bool,
    pub enabled: bool,
    pub ok: bool,
    pub kind: SubsystemKind,
}

impl SubsystemInfo {
    /// 测距子系统在线
    pub fn range_finder_online() -> Self {
        Self {
            present: true,
            enabled: true,
            ok: true,
            kind: SubsystemKind::RangeFinder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_validity_computed_at_construction() {
        let report = RangeFinderReport::new(1_000, 5.0, 0.20, 10.00, 3);
        assert!(report.valid);
        assert_eq!(report.error_count, 3);
        assert_eq!(report.sensor_type, SensorType::Laser);

        let too_close = RangeFinderReport::new(1_000, 0.10, 0.20, 10.00, 0);
        assert!(!too_close.valid);

        let at_max = RangeFinderReport::new(1_000, 10.00, 0.20, 10.00, 0);
        assert!(!at_max.valid);
    }

    #[test]
    fn test_thresholds_change_validity() {
        // 同一距离在不同阈值下有效性不同
        assert!(!RangeFinderReport::new(0, 5.0, 0.20, 4.0, 0).valid);
        assert!(RangeFinderReport::new(0, 5.0, 0.20, 6.0, 0).valid);
    }

    #[test]
    fn test_subsystem_info_online() {
        let info = SubsystemInfo::range_finder_online();
        assert!(info.present && info.enabled && info.ok);
        assert_eq!(info.kind, SubsystemKind::RangeFinder);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_serde_json() {
        let report = RangeFinderReport::new(42, 1.5, 0.20, 10.00, 0);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"timestamp_us\":42"));
    }
}
