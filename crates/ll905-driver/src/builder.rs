//! Builder 模式实现
//!
//! 提供链式构造 `Ll905` 实例的便捷方式。未显式提供的协作者使用默认实现：
//! Linux i2c-dev 总线、独立工作线程调度器、进程内广播总线。

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::ll905::Ll905;
use crate::scheduler::{Scheduler, WorkQueue};
use crate::telemetry::{TelemetryBus, TelemetryChannel};
use ll905_i2c::I2cTransport;
use std::sync::Arc;

/// 默认 I2C 总线编号（`/dev/i2c-1`）
pub const DEFAULT_I2C_BUS: u32 = 1;

/// Ll905 Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use ll905_driver::Ll905Builder;
///
/// // 默认总线与地址
/// let lidar = Ll905Builder::new().build().unwrap();
///
/// // 第二个实例：不同总线，非主实例（不广播报告）
/// let secondary = Ll905Builder::new()
///     .i2c_bus(2)
///     .primary(false)
///     .queue_depth(10)
///     .build()
///     .unwrap();
/// ```
pub struct Ll905Builder {
    /// I2C 总线编号，未设置时使用 [`DEFAULT_I2C_BUS`]
    i2c_bus: Option<u32>,
    config: DriverConfig,
    transport: Option<Box<dyn I2cTransport>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    telemetry: Option<Arc<dyn TelemetryChannel>>,
}

impl Default for Ll905Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Ll905Builder {
    pub fn new() -> Self {
        Self {
            i2c_bus: None,
            config: DriverConfig::default(),
            transport: None,
            scheduler: None,
            telemetry: None,
        }
    }

    /// 设置 I2C 总线编号（可选，默认 1）
    pub fn i2c_bus(mut self, bus: u32) -> Self {
        self.i2c_bus = Some(bus);
        self
    }

    /// 设置 7 位设备地址（可选，默认 0x62）
    pub fn address(mut self, address: u16) -> Self {
        self.config.address = address;
        self
    }

    /// 设置总线重试次数（可选，默认 3）
    pub fn retries(mut self, retries: u8) -> Self {
        self.config.retries = retries;
        self
    }

    /// 设置初始报告队列深度（可选，默认 2）
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = depth;
        self
    }

    /// 是否为主实例（可选，默认 true）
    pub fn primary(mut self, primary: bool) -> Self {
        self.config.primary = primary;
        self
    }

    /// 整体替换配置
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用自定义总线（例如仿真设备）
    ///
    /// 设置后忽略 `i2c_bus`，设备地址以 transport 报告的为准。
    pub fn transport(mut self, transport: Box<dyn I2cTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 使用自定义调度器
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// 使用自定义广播通道
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetryChannel>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// 构建 Ll905 实例
    ///
    /// 打开总线、探测设备、分配报告队列。返回的实例处于手动模式。
    ///
    /// # Errors
    /// - `DriverError::InvalidArgument`: 配置无效
    /// - `DriverError::Bus`: 打开总线失败
    /// - `DriverError::Probe`: 设备无应答
    /// - `DriverError::Worker`: 调度线程创建失败
    pub fn build(self) -> Result<Ll905, DriverError> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => open_bus(self.i2c_bus.unwrap_or(DEFAULT_I2C_BUS), &self.config)?,
        };

        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(
                WorkQueue::new("ll905-work").map_err(|e| DriverError::Worker(e.to_string()))?,
            ),
        };

        let telemetry: Arc<dyn TelemetryChannel> = match self.telemetry {
            Some(telemetry) => telemetry,
            None => Arc::new(TelemetryBus::new()),
        };

        Ll905::init(transport, scheduler, telemetry, self.config)
    }
}

#[cfg(target_os = "linux")]
fn open_bus(bus: u32, config: &DriverConfig) -> Result<Box<dyn I2cTransport>, DriverError> {
    let adapter = ll905_i2c::LinuxI2cBus::new(bus, config.address, config.retries)?;
    Ok(Box::new(adapter))
}

#[cfg(not(target_os = "linux"))]
fn open_bus(bus: u32, _config: &DriverConfig) -> Result<Box<dyn I2cTransport>, DriverError> {
    use ll905_i2c::{BusDeviceError, BusDeviceErrorKind, BusError};

    Err(DriverError::Bus(BusError::Device(BusDeviceError::new(
        BusDeviceErrorKind::NotFound,
        format!("i2c-dev bus {} is only available on Linux", bus),
    ))))
}
