//! # LL905 I2C Transport Layer
//!
//! I2C 总线抽象层，提供统一的寄存器读写接口。
//!
//! 驱动只依赖 [`I2cTransport`]，具体后端：
//! - Linux: [`LinuxI2cBus`]（`/dev/i2c-N`，`I2C_RDWR` 组合传输）
//! - 测试/仿真: `SimulatedLidar`（需要 `mock` feature）

use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxI2cBus;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::SimulatedLidar;

/// I2C 传输层统一错误类型
#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] BusDeviceError),
    #[error("Transfer timeout")]
    Timeout,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDeviceErrorKind {
    Unknown,
    /// 从机未应答（地址错误、设备掉线或忙）
    NoAcknowledge,
    /// 总线设备节点不存在
    NotFound,
    AccessDenied,
    /// 访问了设备不支持的寄存器
    InvalidRegister,
    /// 写入/读取长度与寄存器不匹配
    InvalidLength,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct BusDeviceError {
    pub kind: BusDeviceErrorKind,
    pub message: String,
}

impl BusDeviceError {
    pub fn new(kind: BusDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            BusDeviceErrorKind::NotFound | BusDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for BusDeviceError {
    fn from(message: String) -> Self {
        Self::new(BusDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for BusDeviceError {
    fn from(message: &str) -> Self {
        Self::new(BusDeviceErrorKind::Unknown, message)
    }
}

/// 寄存器寻址总线的传输原语
///
/// 一次调用完成"先写后读"的组合传输：
/// - `write` 为空时只读，`read` 为空时只写
/// - 从机地址和重试次数在构造时确定，调用方不再重试
///
/// 实现方必须保证一次 `transfer` 的原子性（不与其它传输交错）。
pub trait I2cTransport: Send {
    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), BusError>;

    /// 从机地址（仅用于日志和诊断）
    fn address(&self) -> u16;
}

impl<T: I2cTransport + ?Sized> I2cTransport for Box<T> {
    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        (**self).transfer(write, read)
    }

    fn address(&self) -> u16 {
        (**self).address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_error_display() {
        let err = BusError::Device(BusDeviceError::new(
            BusDeviceErrorKind::NoAcknowledge,
            "address 0x62",
        ));
        let msg = format!("{}", err);
        assert!(msg.contains("NoAcknowledge") && msg.contains("0x62"), "{}", msg);

        assert_eq!(format!("{}", BusError::Timeout), "Transfer timeout");
    }

    #[test]
    fn test_device_error_fatality() {
        assert!(BusDeviceError::new(BusDeviceErrorKind::NotFound, "").is_fatal());
        assert!(BusDeviceError::new(BusDeviceErrorKind::AccessDenied, "").is_fatal());
        assert!(!BusDeviceError::new(BusDeviceErrorKind::NoAcknowledge, "").is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: BusError = io.into();
        assert!(matches!(err, BusError::Io(_)));
    }

    #[test]
    fn test_device_error_from_str() {
        let err: BusDeviceError = "weird".into();
        assert_eq!(err.kind, BusDeviceErrorKind::Unknown);
        assert_eq!(err.message, "weird");
    }
}
