//! 驱动层模块
//!
//! 本模块提供 LL905 激光测距模块的采集驱动，包括：
//! - 测量/读取两阶段状态机（固定 100ms 转换时间）
//! - 报告环形缓冲区（满时覆盖最旧报告）
//! - 采样率、队列深度、有效距离阈值控制
//! - 报告广播（主实例）与子系统状态通知
//!
//! # 外部协作者
//!
//! - 总线：[`ll905_i2c::I2cTransport`]
//! - 定时调度：[`Scheduler`]（[`WorkQueue`] 线程实现，[`ManualScheduler`] 确定性实现）
//! - 广播通道：[`TelemetryChannel`]（[`TelemetryBus`] 实现）

mod builder;
pub mod config;
pub mod control;
mod error;
mod ll905;
pub mod metrics;
pub mod ring_buffer;
pub mod scheduler;
pub mod state;
pub mod telemetry;

pub use builder::{DEFAULT_I2C_BUS, Ll905Builder};
pub use config::DriverConfig;
pub use control::PollRate;
pub use error::{BufferError, DriverError};
pub use ll905::{DriverInfo, Ll905, START_DELAY};
pub use metrics::{DriverMetrics, MetricsSnapshot};
pub use ring_buffer::RingBuffer;
pub use scheduler::{ManualScheduler, Scheduler, Work, WorkKey, WorkQueue};
pub use state::AcquisitionState;
pub use telemetry::{PublishHandle, Telemetry, TelemetryBus, TelemetryChannel, Topic};

pub use ll905_protocol::{RangeFinderReport, SensorType, SubsystemInfo};
