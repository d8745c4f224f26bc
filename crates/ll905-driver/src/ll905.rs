//! LL905 驱动（对外 API）
//!
//! 封装测量/读取两阶段状态机、报告队列和控制接口。
//!
//! # 调度模型
//!
//! ```text
//! start ──► [Starting] ──tick──► measure ──► [AwaitingMeasurement]
//!                                   ▲                 │ tick (+100ms)
//!                                   │                 ▼
//!                     tick (+gap) ──┴── [AwaitingCollectGap] ◄── collect
//! ```
//!
//! - 每个 tick 执行完毕后才调度下一个 tick，不存在并发 tick
//! - 手动模式（间隔为 0）下没有调度中的 tick，`read` 直接同步访问总线
//! - `stop` 递增 epoch 并取消待执行 tick；已经在执行的 tick 结束后不会再调度

use crate::config::{DriverConfig, check_distance};
use crate::control::PollRate;
use crate::error::DriverError;
use crate::metrics::{DriverMetrics, MetricsSnapshot};
use crate::ring_buffer::RingBuffer;
use crate::scheduler::{Scheduler, WorkKey};
use crate::state::{AcquisitionState, CycleState};
use crate::telemetry::{PublishHandle, Telemetry, TelemetryChannel, Topic};
use arc_swap::ArcSwapOption;
use ll905_i2c::I2cTransport;
use ll905_protocol::{
    CONVERSION_INTERVAL, RangeFinderReport, SubsystemInfo, decode_distance,
    encode_distance_request, encode_measure_command, encode_reset_command,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 启动后首个 tick 的延迟
pub const START_DELAY: Duration = Duration::from_millis(1);

struct DriverInner {
    bus: Mutex<Box<dyn I2cTransport>>,
    address: u16,
    primary: bool,
    reports: RingBuffer<RangeFinderReport>,
    cycle: Mutex<CycleState>,
    /// f32 位模式
    min_distance: AtomicU32,
    max_distance: AtomicU32,
    metrics: DriverMetrics,
    latest: ArcSwapOption<RangeFinderReport>,
    scheduler: Arc<dyn Scheduler>,
    /// 本实例在调度器中的槽位
    work_key: WorkKey,
    telemetry: Arc<dyn TelemetryChannel>,
    range_topic: Option<PublishHandle>,
    subsystem_topic: PublishHandle,
}

impl DriverInner {
    fn min_distance(&self) -> f32 {
        f32::from_bits(self.min_distance.load(Ordering::Relaxed))
    }

    fn max_distance(&self) -> f32 {
        f32::from_bits(self.max_distance.load(Ordering::Relaxed))
    }

    /// 发起一次测量
    fn measure(&self) -> Result<(), DriverError> {
        let result = self.bus.lock().transfer(&encode_measure_command(), &mut []);

        result.map_err(|e| {
            let errors = self.metrics.count_comms_error();
            warn!("measure transfer failed ({} comms errors): {}", errors, e);
            DriverError::Bus(e)
        })
    }

    /// 复位设备（FPGA 重新加载默认寄存器）
    fn reset_device(&self) -> Result<(), DriverError> {
        let result = self.bus.lock().transfer(&encode_reset_command(), &mut []);

        result.map_err(|e| {
            let errors = self.metrics.count_comms_error();
            warn!("reset transfer failed ({} comms errors): {}", errors, e);
            DriverError::Bus(e)
        })
    }

    /// 读取距离寄存器，生成报告并写入队列
    fn collect(&self) -> Result<RangeFinderReport, DriverError> {
        let started = Instant::now();
        let mut raw = [0u8; 2];

        let result = self.bus.lock().transfer(&encode_distance_request(), &mut raw);

        if let Err(e) = result {
            let errors = self.metrics.count_comms_error();
            warn!("error reading from sensor ({} comms errors): {}", errors, e);
            self.metrics.record_sample(started.elapsed());
            return Err(DriverError::Bus(e));
        }

        // 接近测量结束时刻，作为采样时间的最佳近似
        let report = RangeFinderReport::new(
            self.scheduler.now_us(),
            decode_distance(raw),
            self.min_distance(),
            self.max_distance(),
            self.metrics.comms_errors(),
        );

        if let Some(handle) = self.range_topic {
            self.telemetry.publish(handle, &Telemetry::Range(report));
        }

        if self.reports.force(report) {
            self.metrics.count_buffer_overflow();
        }
        self.latest.store(Some(Arc::new(report)));

        self.metrics.record_sample(started.elapsed());
        trace!("collected {:.2} m (valid: {})", report.distance, report.valid);
        Ok(report)
    }

    /// 调度下一个 tick，回调只持有弱引用
    fn schedule(self: &Arc<Self>, cycle: &CycleState, delay: Duration) {
        let weak = Arc::downgrade(self);
        let epoch = cycle.epoch;

        self.scheduler.schedule_after(
            self.work_key,
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.cycle(epoch);
                }
            }),
        );
    }

    /// 重置状态机并调度首个 tick（调用方持有 cycle 锁）
    fn start_locked(self: &Arc<Self>, cycle: &mut CycleState) {
        cycle.collect_phase = false;
        cycle.epoch = cycle.epoch.wrapping_add(1);
        cycle.state = AcquisitionState::Starting;
        self.reports.flush();

        self.schedule(cycle, START_DELAY);

        self.telemetry.publish(
            self.subsystem_topic,
            &Telemetry::Subsystem(SubsystemInfo::range_finder_online()),
        );
        debug!(
            "acquisition started (interval {}us)",
            cycle.interval.as_micros()
        );
    }

    /// 取消调度（调用方持有 cycle 锁）
    fn stop_locked(&self, cycle: &mut CycleState) {
        cycle.epoch = cycle.epoch.wrapping_add(1);
        cycle.state = AcquisitionState::Idle;
        self.scheduler.cancel(self.work_key);
    }

    /// 调度 tick：collect 上一次测量并发起下一次测量
    fn cycle(self: &Arc<Self>, epoch: u64) {
        let mut cycle = self.cycle.lock();

        if cycle.epoch != epoch || !cycle.state.is_active() {
            trace!("stale tick (epoch {}, current {})", epoch, cycle.epoch);
            return;
        }

        if cycle.collect_phase {
            if let Err(e) = self.collect() {
                warn!("collection error, restarting acquisition: {}", e);
                self.start_locked(&mut cycle);
                return;
            }

            cycle.collect_phase = false;

            // collect 与下一次 measure 之间是否需要间隔
            if cycle.interval > CONVERSION_INTERVAL {
                let gap = cycle.interval - CONVERSION_INTERVAL;
                cycle.state = AcquisitionState::AwaitingCollectGap;
                self.schedule(&cycle, gap);
                return;
            }
        }

        // 触发失败不影响调度，只影响下一次 collect 的数据质量
        if let Err(e) = self.measure() {
            warn!("measure error: {}", e);
        }

        cycle.collect_phase = true;
        cycle.state = AcquisitionState::AwaitingMeasurement;
        self.schedule(&cycle, CONVERSION_INTERVAL);
    }
}

/// LL905 激光测距驱动
///
/// 所有方法都接收 `&self`，可以通过 `Arc<Ll905>` 在多个线程间共享。
/// Drop 时停止调度并释放报告队列。
///
/// # Example
///
/// ```rust,no_run
/// use ll905_driver::{Ll905Builder, PollRate};
///
/// let lidar = Ll905Builder::new().i2c_bus(1).build().unwrap();
/// lidar.set_rate(PollRate::Hz(5)).unwrap();
///
/// if lidar.wait_for_report(std::time::Duration::from_secs(1)) {
///     for report in lidar.read(4).unwrap() {
///         println!("{:.2} m", report.distance);
///     }
/// }
/// ```
pub struct Ll905 {
    inner: Arc<DriverInner>,
}

impl Ll905 {
    /// 初始化驱动
    ///
    /// 探测设备（发送一次测量命令）、分配报告队列、广告主题。
    /// 初始化后不启动周期采集（手动模式）。
    ///
    /// # 错误
    /// - `DriverError::InvalidArgument`: 配置无效
    /// - `DriverError::Probe`: 设备无应答（实例不可用）
    /// - `DriverError::Buffer`: 报告队列分配失败
    pub fn init(
        mut bus: Box<dyn I2cTransport>,
        scheduler: Arc<dyn Scheduler>,
        telemetry: Arc<dyn TelemetryChannel>,
        config: DriverConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;

        let address = bus.address();
        bus.transfer(&encode_measure_command(), &mut [])
            .map_err(DriverError::Probe)?;

        let reports = RingBuffer::new(config.queue_depth)?;

        let range_topic = if config.primary {
            Some(telemetry.advertise(Topic::RangeFinder))
        } else {
            None
        };
        let subsystem_topic = telemetry.advertise(Topic::SubsystemInfo);

        info!(
            "LL905 initialised at 0x{:02X} (primary: {}, queue depth: {})",
            address, config.primary, config.queue_depth
        );

        Ok(Self {
            inner: Arc::new(DriverInner {
                bus: Mutex::new(bus),
                address,
                primary: config.primary,
                reports,
                cycle: Mutex::new(CycleState::default()),
                min_distance: AtomicU32::new(config.min_distance.to_bits()),
                max_distance: AtomicU32::new(config.max_distance.to_bits()),
                metrics: DriverMetrics::new(),
                latest: ArcSwapOption::empty(),
                scheduler,
                work_key: WorkKey::new(),
                telemetry,
                range_topic,
                subsystem_topic,
            }),
        })
    }

    /// 启动（或重启）周期采集状态机
    ///
    /// 清空报告队列，调度首个 tick，并广播子系统在线通知。
    /// 手动模式下先切换到默认采样率，`get_rate` 与调度状态保持一致。
    pub fn start(&self) {
        let mut cycle = self.inner.cycle.lock();
        if cycle.interval.is_zero() {
            cycle.interval = CONVERSION_INTERVAL;
            info!("start in manual mode, using default poll rate");
        }
        self.inner.start_locked(&mut cycle);
    }

    /// 停止周期采集（幂等）
    ///
    /// 保留采样间隔：之后的 `start` 或 `set_rate` 以周期模式恢复采集，
    /// 停止期间 `read` 只读取队列。
    pub fn stop(&self) {
        let mut cycle = self.inner.cycle.lock();
        if cycle.state.is_active() {
            debug!("acquisition stopped");
        }
        self.inner.stop_locked(&mut cycle);
    }

    /// 设置采样率
    ///
    /// - 从手动模式切换到周期模式时启动采集
    /// - 周期模式之间切换只更新间隔，下一个 tick 开始生效
    /// - 切换到手动模式时取消调度
    ///
    /// # 错误
    /// - `DriverError::InvalidArgument`: External、0 Hz 或超过最大采样率（状态不变）
    pub fn set_rate(&self, rate: PollRate) -> Result<(), DriverError> {
        let requested = rate.interval()?;
        let mut cycle = self.inner.cycle.lock();

        match requested {
            None => {
                self.inner.stop_locked(&mut cycle);
                cycle.interval = Duration::ZERO;
                info!("switched to manual polling");
            },
            Some(interval) => {
                // 手动模式或 stop 之后都需要重新启动
                let want_start = !cycle.state.is_active();
                cycle.interval = interval;
                info!("poll rate set to {} ({}us)", rate, interval.as_micros());

                if want_start {
                    self.inner.start_locked(&mut cycle);
                }
            },
        }
        Ok(())
    }

    /// 当前采样率（`Manual` 或 `Hz(n)`）
    pub fn get_rate(&self) -> PollRate {
        PollRate::from_interval(self.measure_interval())
    }

    /// 当前采样间隔（零表示手动模式）
    pub fn measure_interval(&self) -> Duration {
        self.inner.cycle.lock().interval
    }

    /// 当前状态机状态
    pub fn acquisition_state(&self) -> AcquisitionState {
        self.inner.cycle.lock().state
    }

    /// 设置报告队列深度（1..=100）
    ///
    /// # 错误
    /// - `DriverError::Buffer(InvalidCapacity)`: 超出范围（深度不变）
    /// - `DriverError::Buffer(OutOfMemory)`: 分配失败（深度不变）
    pub fn set_queue_depth(&self, depth: usize) -> Result<(), DriverError> {
        self.inner.reports.resize(depth)?;
        debug!("queue depth set to {}", depth);
        Ok(())
    }

    /// 报告队列深度（容量）
    pub fn get_queue_depth(&self) -> usize {
        self.inner.reports.capacity()
    }

    /// 队列中待读取的报告数
    pub fn queued_reports(&self) -> usize {
        self.inner.reports.len()
    }

    /// 设置最小有效距离（下一次 collect 生效）
    pub fn set_min_distance(&self, meters: f32) -> Result<(), DriverError> {
        check_distance("min_distance", meters)?;
        self.inner
            .min_distance
            .store(meters.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// 设置最大有效距离（下一次 collect 生效）
    pub fn set_max_distance(&self, meters: f32) -> Result<(), DriverError> {
        check_distance("max_distance", meters)?;
        self.inner
            .max_distance
            .store(meters.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    pub fn min_distance(&self) -> f32 {
        self.inner.min_distance()
    }

    pub fn max_distance(&self) -> f32 {
        self.inner.max_distance()
    }

    /// 读取报告
    ///
    /// - 周期模式：非阻塞地弹出最多 `max_items` 份报告
    /// - 手动模式：同步执行一次 measure → 等待转换时间 → collect，返回这一份报告
    ///
    /// # 错误
    /// - `DriverError::InvalidArgument`: `max_items` 为 0
    /// - `DriverError::NoData`: 周期模式下队列为空
    /// - `DriverError::Bus`: 手动模式下总线传输失败
    pub fn read(&self, max_items: usize) -> Result<Vec<RangeFinderReport>, DriverError> {
        if max_items == 0 {
            return Err(DriverError::InvalidArgument(
                "read buffer must hold at least one report".to_string(),
            ));
        }

        if !self.measure_interval().is_zero() {
            let reports = self.inner.reports.get_many(max_items);
            if reports.is_empty() {
                return Err(DriverError::NoData);
            }
            return Ok(reports);
        }

        // 手动模式：运行一次转换
        self.inner.reports.flush();
        self.inner.measure()?;
        self.inner.scheduler.sleep(CONVERSION_INTERVAL);
        self.inner.collect()?;

        match self.inner.reports.get() {
            Some(report) => Ok(vec![report]),
            None => Err(DriverError::NoData),
        }
    }

    /// 等待报告队列非空（超时返回 `false`）
    pub fn wait_for_report(&self, timeout: Duration) -> bool {
        self.inner.reports.wait_for_data(timeout)
    }

    /// 最近一次 collect 的报告（不影响队列）
    pub fn latest_report(&self) -> Option<RangeFinderReport> {
        self.inner.latest.load_full().map(|report| *report)
    }

    /// 控制接口的复位请求
    ///
    /// 尚未支持，始终返回 `NotImplemented`。需要显式复位设备时使用
    /// [`reset_device`](Self::reset_device)。
    pub fn reset(&self) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented("sensor reset".to_string()))
    }

    /// 发送复位命令（不属于调度周期，显式恢复操作）
    pub fn reset_device(&self) -> Result<(), DriverError> {
        self.inner.reset_device()
    }

    /// 是否为主实例
    pub fn is_primary(&self) -> bool {
        self.inner.primary
    }

    /// 诊断计数器快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// 诊断信息
    pub fn info(&self) -> DriverInfo {
        let (interval, state) = {
            let cycle = self.inner.cycle.lock();
            (cycle.interval, cycle.state)
        };

        DriverInfo {
            address: self.inner.address,
            primary: self.inner.primary,
            interval,
            state,
            queue_depth: self.inner.reports.capacity(),
            queued: self.inner.reports.len(),
            min_distance: self.min_distance(),
            max_distance: self.max_distance(),
            metrics: self.metrics(),
        }
    }
}

impl Drop for Ll905 {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 驱动诊断信息
#[derive(Debug, Clone, PartialEq)]
pub struct DriverInfo {
    pub address: u16,
    pub primary: bool,
    pub interval: Duration,
    pub state: AcquisitionState,
    pub queue_depth: usize,
    pub queued: usize,
    pub min_distance: f32,
    pub max_distance: f32,
    pub metrics: MetricsSnapshot,
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.metrics)?;
        writeln!(
            f,
            "address:        0x{:02X}{}",
            self.address,
            if self.primary { " (primary)" } else { "" }
        )?;
        writeln!(f, "poll interval:  {} us", self.interval.as_micros())?;
        writeln!(f, "state:          {:?}", self.state)?;
        writeln!(
            f,
            "range:          {:.2} .. {:.2} m",
            self.min_distance, self.max_distance
        )?;
        write!(f, "report queue:   {}/{}", self.queued, self.queue_depth)
    }
}
