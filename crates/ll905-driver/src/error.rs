//! 驱动层错误类型定义

use ll905_i2c::BusError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 总线传输错误（计入通信错误计数）
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// 报告缓冲区错误
    #[error("Report buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// 初始化探测失败（实例不可用）
    #[error("Device probe failed: {0}")]
    Probe(#[source] BusError),

    /// 参数超出范围（未修改任何状态）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 缓冲区为空（不计为错误）
    #[error("No data available")]
    NoData,

    /// 功能未实现
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// 调度线程错误
    #[error("Worker thread error: {0}")]
    Worker(String),
}

/// 报告缓冲区错误（缓冲区保持不变）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Invalid queue depth {requested} (expected 1..=100)")]
    InvalidCapacity { requested: usize },

    #[error("Out of memory allocating {requested} reports")]
    OutOfMemory { requested: usize },
}
