//! 采集状态机状态

use std::time::Duration;

/// 采集状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    /// 无调度活动（手动模式或已停止）
    #[default]
    Idle,
    /// 已启动，首个 tick 尚未执行（首个 tick 发起测量）
    Starting,
    /// 已发起测量，等待转换完成后 collect
    AwaitingMeasurement,
    /// collect 完成，等待采样间隔的剩余部分后再次测量
    AwaitingCollectGap,
}

impl AcquisitionState {
    /// 是否有调度中的 tick
    pub fn is_active(self) -> bool {
        self != AcquisitionState::Idle
    }
}

/// 调度 tick 共享的状态（由 `cycle` 锁保护）
#[derive(Debug, Default)]
pub(crate) struct CycleState {
    /// 采样间隔，零表示手动模式
    pub interval: Duration,
    /// 下一个 tick 是否执行 collect
    pub collect_phase: bool,
    /// 每次启动/停止递增，过期的 tick 直接丢弃
    pub epoch: u64,
    pub state: AcquisitionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cycle_state_is_manual_idle() {
        let state = CycleState::default();
        assert!(state.interval.is_zero());
        assert!(!state.collect_phase);
        assert_eq!(state.state, AcquisitionState::Idle);
        assert!(!state.state.is_active());
        assert!(AcquisitionState::AwaitingCollectGap.is_active());
    }
}
