//! 报告环形缓冲区
//!
//! 有界 FIFO，满时覆盖最旧元素（force 策略）。
//!
//! # 线程安全
//!
//! `force` / `get` / `flush` / `resize` 各自是一个完整的临界区，互不交错：
//! - 调度线程在 collect 中调用 `force`
//! - 任意消费者线程调用 `get` / `get_many` / `resize`
//!
//! `resize` 在锁外分配新存储，锁内一次性交换，分配失败时缓冲区保持不变。

use crate::error::BufferError;
use ll905_protocol::{MAX_QUEUE_DEPTH, MIN_QUEUE_DEPTH};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

/// 有界环形缓冲区
pub struct RingBuffer<T> {
    ring: Mutex<Ring<T>>,
    /// 有新数据时唤醒等待者
    data_ready: Condvar,
}

fn check_capacity(capacity: usize) -> Result<(), BufferError> {
    if (MIN_QUEUE_DEPTH..=MAX_QUEUE_DEPTH).contains(&capacity) {
        Ok(())
    } else {
        Err(BufferError::InvalidCapacity {
            requested: capacity,
        })
    }
}

fn allocate<T>(capacity: usize) -> Result<VecDeque<T>, BufferError> {
    let mut items = VecDeque::new();
    items
        .try_reserve_exact(capacity)
        .map_err(|_| BufferError::OutOfMemory {
            requested: capacity,
        })?;
    Ok(items)
}

impl<T> RingBuffer<T> {
    /// 创建容量为 `capacity` 的缓冲区（1..=100）
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        check_capacity(capacity)?;
        Ok(Self {
            ring: Mutex::new(Ring {
                items: allocate(capacity)?,
                capacity,
            }),
            data_ready: Condvar::new(),
        })
    }

    /// 插入元素，满时丢弃最旧元素
    ///
    /// # 返回
    ///
    /// 发生覆盖时返回 `true`（调用方据此累加溢出计数）
    pub fn force(&self, item: T) -> bool {
        let evicted = {
            let mut ring = self.ring.lock();
            let evicted = if ring.items.len() >= ring.capacity {
                ring.items.pop_front();
                true
            } else {
                false
            };
            ring.items.push_back(item);
            evicted
        };

        self.data_ready.notify_all();
        evicted
    }

    /// 弹出最旧元素
    pub fn get(&self) -> Option<T> {
        self.ring.lock().items.pop_front()
    }

    /// 在一个临界区内弹出最多 `max_items` 个元素（按插入顺序）
    pub fn get_many(&self, max_items: usize) -> Vec<T> {
        let mut ring = self.ring.lock();
        let count = max_items.min(ring.items.len());
        ring.items.drain(..count).collect()
    }

    /// 清空所有元素
    pub fn flush(&self) {
        self.ring.lock().items.clear();
    }

    /// 修改容量
    ///
    /// 缩容时保留最新的元素，超出部分丢弃。
    ///
    /// # 错误
    /// - `BufferError::InvalidCapacity`: 容量不在 1..=100
    /// - `BufferError::OutOfMemory`: 新存储分配失败
    pub fn resize(&self, new_capacity: usize) -> Result<(), BufferError> {
        check_capacity(new_capacity)?;
        let mut storage = allocate(new_capacity)?;

        let mut ring = self.ring.lock();
        let skip = ring.items.len().saturating_sub(new_capacity);
        storage.extend(ring.items.drain(..).skip(skip));
        ring.items = storage;
        ring.capacity = new_capacity;
        Ok(())
    }

    /// 当前元素个数
    pub fn len(&self) -> usize {
        self.ring.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().items.is_empty()
    }

    /// 当前容量
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity
    }

    /// 等待缓冲区非空
    ///
    /// # 返回
    ///
    /// 超时前缓冲区非空返回 `true`
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ring = self.ring.lock();

        while ring.items.is_empty() {
            if self.data_ready.wait_until(&mut ring, deadline).timed_out() {
                return !ring.items.is_empty();
            }
        }
        true
    }
}
