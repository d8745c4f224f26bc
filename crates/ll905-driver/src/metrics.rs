//! 驱动诊断计数器
//!
//! 所有计数器都使用原子操作，可以在任何线程读取，不会引入锁竞争。
//! 计数器只增不减，驱动运行期间不会重置。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 驱动诊断计数器
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// collect 次数（含失败）
    pub samples: AtomicU64,

    /// collect 累计耗时（微秒）
    pub sample_time_total_us: AtomicU64,

    /// 最近一次 collect 耗时（微秒）
    pub sample_time_last_us: AtomicU64,

    /// 最长 collect 耗时（微秒）
    pub sample_time_max_us: AtomicU64,

    /// 总线通信错误次数
    pub comms_errors: AtomicU64,

    /// 报告队列覆盖次数
    ///
    /// 如果这个值快速增长，说明消费者读取速度跟不上采样速度，
    /// 可以考虑增大队列深度。
    pub buffer_overflows: AtomicU64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 collect 耗时
    pub fn record_sample(&self, elapsed: Duration) {
        let us = elapsed.as_micros() as u64;
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.sample_time_total_us.fetch_add(us, Ordering::Relaxed);
        self.sample_time_last_us.store(us, Ordering::Relaxed);
        self.sample_time_max_us.fetch_max(us, Ordering::Relaxed);
    }

    /// 通信错误计数加一，返回新的累计值
    pub fn count_comms_error(&self) -> u64 {
        self.comms_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn comms_errors(&self) -> u64 {
        self.comms_errors.load(Ordering::Relaxed)
    }

    pub fn count_buffer_overflow(&self) {
        self.buffer_overflows.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取快照
    ///
    /// 各计数器分别读取，之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples: self.samples.load(Ordering::Relaxed),
            sample_time_total_us: self.sample_time_total_us.load(Ordering::Relaxed),
            sample_time_last_us: self.sample_time_last_us.load(Ordering::Relaxed),
            sample_time_max_us: self.sample_time_max_us.load(Ordering::Relaxed),
            comms_errors: self.comms_errors.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub samples: u64,
    pub sample_time_total_us: u64,
    pub sample_time_last_us: u64,
    pub sample_time_max_us: u64,
    pub comms_errors: u64,
    pub buffer_overflows: u64,
}

impl MetricsSnapshot {
    /// 平均 collect 耗时（微秒）
    pub fn sample_time_avg_us(&self) -> u64 {
        if self.samples == 0 {
            return 0;
        }
        self.sample_time_total_us / self.samples
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ll905_read: {} events, {}us avg, {}us last, {}us max",
            self.samples,
            self.sample_time_avg_us(),
            self.sample_time_last_us,
            self.sample_time_max_us
        )?;
        writeln!(f, "ll905_comms_errors: {} events", self.comms_errors)?;
        write!(f, "ll905_buffer_overflows: {} events", self.buffer_overflows)
    }
}
