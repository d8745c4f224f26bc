//! 广播通道（Telemetry）
//!
//! 驱动通过 [`TelemetryChannel`] 广播测距报告和子系统状态通知。
//!
//! # 设计原则
//!
//! - **一次广告，多次发布**: `advertise` 在初始化时调用一次，返回的句柄在实例生命周期内复用
//! - **非阻塞**: 发布使用 `try_send`，订阅者队列满时丢弃消息并计数
//! - **主实例**: 同一类设备只有主实例广告报告主题，避免重复主题
//!
//! # 使用示例
//!
//! ```rust
//! use ll905_driver::telemetry::{Telemetry, TelemetryBus, TelemetryChannel, Topic};
//! use ll905_driver::SubsystemInfo;
//!
//! let bus = TelemetryBus::new();
//! let rx = bus.subscribe(Topic::SubsystemInfo, 8);
//!
//! let handle = bus.advertise(Topic::SubsystemInfo);
//! bus.publish(handle, &Telemetry::Subsystem(SubsystemInfo::range_finder_online()));
//!
//! assert!(matches!(rx.try_recv(), Ok(Telemetry::Subsystem(_))));
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use ll905_protocol::{RangeFinderReport, SubsystemInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{trace, warn};

/// 广播主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 测距报告
    RangeFinder,
    /// 子系统存在性通知
    SubsystemInfo,
}

/// 广播消息
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    Range(RangeFinderReport),
    Subsystem(SubsystemInfo),
}

impl Telemetry {
    /// 消息所属主题
    pub fn topic(&self) -> Topic {
        match self {
            Telemetry::Range(_) => Topic::RangeFinder,
            Telemetry::Subsystem(_) => Topic::SubsystemInfo,
        }
    }
}

/// 发布句柄（由 `advertise` 返回）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishHandle {
    topic: Topic,
    id: u32,
}

impl PublishHandle {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// 广播通道接口
pub trait TelemetryChannel: Send + Sync {
    /// 广告主题，返回发布句柄
    fn advertise(&self, topic: Topic) -> PublishHandle;

    /// 发布消息（非阻塞）
    fn publish(&self, handle: PublishHandle, message: &Telemetry);
}

/// 进程内广播总线
///
/// 每个订阅者拥有独立的有界队列。
#[derive(Default)]
pub struct TelemetryBus {
    subscribers: Mutex<HashMap<Topic, Vec<Sender<Telemetry>>>>,
    next_handle: AtomicU32,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅主题，`capacity` 为该订阅者的队列容量
    pub fn subscribe(&self, topic: Topic, capacity: usize) -> Receiver<Telemetry> {
        let (tx, rx) = bounded(capacity);
        self.subscribers.lock().entry(topic).or_default().push(tx);
        rx
    }

    /// 已发布的消息数
    pub fn published_messages(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// 因订阅者队列满而丢弃的消息数
    pub fn dropped_messages(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TelemetryChannel for TelemetryBus {
    fn advertise(&self, topic: Topic) -> PublishHandle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        trace!("advertised {:?} (handle {})", topic, id);
        PublishHandle { topic, id }
    }

    fn publish(&self, handle: PublishHandle, message: &Telemetry) {
        if handle.topic != message.topic() {
            warn!(
                "dropping {:?} message published on {:?} handle",
                message.topic(),
                handle.topic
            );
            return;
        }

        self.published.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock();
        if let Some(senders) = subscribers.get_mut(&handle.topic) {
            // 断开的订阅者直接移除
            senders.retain(|tx| match tx.try_send(*message) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    true
                },
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(distance: f32) -> Telemetry {
        Telemetry::Range(RangeFinderReport::new(0, distance, 0.2, 10.0, 0))
    }

    #[test]
    fn test_publish_reaches_topic_subscribers_only() {
        let bus = TelemetryBus::new();
        let range_rx = bus.subscribe(Topic::RangeFinder, 4);
        let info_rx = bus.subscribe(Topic::SubsystemInfo, 4);

        let handle = bus.advertise(Topic::RangeFinder);
        bus.publish(handle, &report(1.0));

        assert_eq!(range_rx.try_recv().unwrap(), report(1.0));
        assert!(info_rx.try_recv().is_err());
        assert_eq!(bus.published_messages(), 1);
    }

    #[test]
    fn test_handles_are_distinct() {
        let bus = TelemetryBus::new();
        let a = bus.advertise(Topic::RangeFinder);
        let b = bus.advertise(Topic::RangeFinder);
        assert_ne!(a, b);
        assert_eq!(a.topic(), Topic::RangeFinder);
    }

    #[test]
    fn test_full_subscriber_drops_messages() {
        let bus = TelemetryBus::new();
        let rx = bus.subscribe(Topic::RangeFinder, 1);
        let handle = bus.advertise(Topic::RangeFinder);

        bus.publish(handle, &report(1.0));
        bus.publish(handle, &report(2.0));

        assert_eq!(bus.dropped_messages(), 1);
        assert_eq!(rx.try_recv().unwrap(), report(1.0));
    }

    #[test]
    fn test_disconnected_subscriber_removed() {
        let bus = TelemetryBus::new();
        drop(bus.subscribe(Topic::RangeFinder, 1));
        let handle = bus.advertise(Topic::RangeFinder);

        bus.publish(handle, &report(1.0));
        bus.publish(handle, &report(2.0));
        assert_eq!(bus.dropped_messages(), 0);
        assert!(bus.subscribers.lock()[&Topic::RangeFinder].is_empty());
    }

    #[test]
    fn test_topic_mismatch_is_rejected() {
        let bus = TelemetryBus::new();
        let rx = bus.subscribe(Topic::SubsystemInfo, 4);
        let handle = bus.advertise(Topic::SubsystemInfo);

        bus.publish(handle, &report(1.0));
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.published_messages(), 0);
    }
}
