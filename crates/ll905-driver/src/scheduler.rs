//! 单次定时调度（工作队列）
//!
//! 驱动的周期采集由调度器驱动：每个 tick 结束时调度下一个 tick。
//! 调度器按 [`WorkKey`] 划分槽位，每个槽位最多一个待执行任务，
//! 同一槽位重复调度会替换尚未执行的任务。多个驱动实例可以共享一个调度器，
//! 调度与取消只作用于各自的槽位。
//!
//! # 实现
//!
//! - [`WorkQueue`]: 后台线程 + 条件变量，真实单调时钟
//! - [`ManualScheduler`]: 虚拟时钟，由调用方显式推进（用于测试和离线仿真）

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 调度任务
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// 调度槽位标识（进程内唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkKey(u64);

impl WorkKey {
    /// 分配新的槽位标识
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WorkKey {
    fn default() -> Self {
        Self::new()
    }
}

/// 单次定时调度器
///
/// 回调在调度器自己的上下文中执行，可以短暂阻塞（总线传输），
/// 但不应长时间占用。
pub trait Scheduler: Send + Sync {
    /// 在 `delay` 之后执行 `work`，替换 `key` 槽位中尚未执行的任务
    fn schedule_after(&self, key: WorkKey, delay: Duration, work: Work);

    /// 取消 `key` 槽位中尚未执行的任务（没有任务时无操作）
    fn cancel(&self, key: WorkKey);

    /// 单调时钟（微秒）
    fn now_us(&self) -> u64;

    /// 阻塞等待（手动模式读取时等待转换完成）
    fn sleep(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }
}

struct Slots {
    pending: HashMap<WorkKey, (Instant, Work)>,
    shutdown: bool,
}

struct WorkShared {
    slots: Mutex<Slots>,
    wakeup: Condvar,
}

/// 后台线程工作队列
pub struct WorkQueue {
    shared: Arc<WorkShared>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
    epoch: Instant,
}

impl WorkQueue {
    /// 启动名为 `name` 的工作线程
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let shared = Arc::new(WorkShared {
            slots: Mutex::new(Slots {
                pending: HashMap::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let shared_worker = shared.clone();
        let worker = thread::Builder::new()
            .name(name.into())
            .spawn(move || work_loop(&shared_worker))?;
        let worker_id = worker.thread().id();

        Ok(Self {
            shared,
            worker: Some(worker),
            worker_id,
            epoch: Instant::now(),
        })
    }

    /// `key` 槽位是否有尚未执行的任务
    pub fn is_pending(&self, key: WorkKey) -> bool {
        self.shared.slots.lock().pending.contains_key(&key)
    }

    /// 所有槽位中尚未执行的任务数
    pub fn pending_count(&self) -> usize {
        self.shared.slots.lock().pending.len()
    }
}

fn work_loop(shared: &WorkShared) {
    let mut slots = shared.slots.lock();

    loop {
        if slots.shutdown {
            debug!("work queue shutting down");
            return;
        }

        let next = slots
            .pending
            .iter()
            .min_by_key(|(_, (deadline, _))| *deadline)
            .map(|(key, (deadline, _))| (*key, *deadline));

        match next {
            None => shared.wakeup.wait(&mut slots),
            Some((_, deadline)) if Instant::now() < deadline => {
                shared.wakeup.wait_until(&mut slots, deadline);
            },
            Some((key, _)) => {
                if let Some((_, work)) = slots.pending.remove(&key) {
                    // 执行期间释放锁，任务内部可以重新调度
                    MutexGuard::unlocked(&mut slots, work);
                }
            },
        }
    }
}

impl Scheduler for WorkQueue {
    fn schedule_after(&self, key: WorkKey, delay: Duration, work: Work) {
        let mut slots = self.shared.slots.lock();
        if slots.shutdown {
            return;
        }
        slots.pending.insert(key, (Instant::now() + delay, work));
        self.shared.wakeup.notify_one();
    }

    fn cancel(&self, key: WorkKey) {
        if self.shared.slots.lock().pending.remove(&key).is_some() {
            trace!("pending work {:?} cancelled", key);
        }
    }

    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        {
            let mut slots = self.shared.slots.lock();
            slots.shutdown = true;
            slots.pending.clear();
        }
        self.shared.wakeup.notify_all();

        // 最后一个引用可能在工作线程的回调中释放，此时不能 join 自己
        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct ManualEntry {
    key: WorkKey,
    deadline_us: u64,
    /// 同一时刻到期的任务按调度顺序执行
    seq: u64,
    work: Work,
}

struct ManualState {
    now_us: u64,
    pending: Vec<ManualEntry>,
    scheduled: u64,
    cancelled: u64,
}

impl ManualState {
    fn next_index(&self) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| (entry.deadline_us, entry.seq))
            .map(|(index, _)| index)
    }
}

/// 虚拟时钟调度器
///
/// 不会自动执行任务，调用方通过 [`fire`](Self::fire) 或 [`advance`](Self::advance)
/// 推进时间。`sleep` 只推进虚拟时钟。
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now_us: 0,
                pending: Vec::new(),
                scheduled: 0,
                cancelled: 0,
            }),
        }
    }

    /// 是否有尚未执行的任务
    pub fn has_pending(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    /// 尚未执行的任务数
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// 距离最早到期任务的时间
    pub fn pending_delay(&self) -> Option<Duration> {
        let state = self.state.lock();
        state
            .next_index()
            .map(|index| state.pending[index].deadline_us.saturating_sub(state.now_us))
            .map(Duration::from_micros)
    }

    /// 立即把时钟推进到最早到期任务的到期时间并执行它
    ///
    /// # 返回
    ///
    /// 没有待执行任务时返回 `false`
    pub fn fire(&self) -> bool {
        let work = {
            let mut state = self.state.lock();
            match state.next_index() {
                Some(index) => {
                    let entry = state.pending.swap_remove(index);
                    state.now_us = state.now_us.max(entry.deadline_us);
                    entry.work
                },
                None => return false,
            }
        };
        work();
        true
    }

    /// 推进时钟 `duration`，依次执行期间到期的任务
    pub fn advance(&self, duration: Duration) {
        let target = self.state.lock().now_us + duration.as_micros() as u64;

        loop {
            let due = {
                let state = self.state.lock();
                state
                    .next_index()
                    .is_some_and(|index| state.pending[index].deadline_us <= target)
            };
            if !due || !self.fire() {
                break;
            }
        }

        let mut state = self.state.lock();
        state.now_us = state.now_us.max(target);
    }

    /// 累计调度次数
    pub fn schedule_count(&self) -> u64 {
        self.state.lock().scheduled
    }

    /// 实际取消了任务的次数
    pub fn cancel_count(&self) -> u64 {
        self.state.lock().cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, key: WorkKey, delay: Duration, work: Work) {
        let mut state = self.state.lock();
        state.pending.retain(|entry| entry.key != key);

        let deadline_us = state.now_us + delay.as_micros() as u64;
        state.scheduled += 1;
        let seq = state.scheduled;
        state.pending.push(ManualEntry {
            key,
            deadline_us,
            seq,
            work,
        });
    }

    fn cancel(&self, key: WorkKey) {
        let mut state = self.state.lock();
        let before = state.pending.len();
        state.pending.retain(|entry| entry.key != key);
        if state.pending.len() < before {
            state.cancelled += 1;
        }
    }

    fn now_us(&self) -> u64 {
        self.state.lock().now_us
    }

    fn sleep(&self, duration: Duration) {
        self.state.lock().now_us += duration.as_micros() as u64;
    }
}
