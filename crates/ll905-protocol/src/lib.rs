//! # LL905 Protocol
//!
//! LIDAR-Lite 测距模块的寄存器协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 设备常量（地址、转换时间、量程）
//! - `registers`: 寄存器地址与命令值
//! - `codec`: 命令构建与距离寄存器解码
//! - `report`: 测距报告与子系统状态
//!
//! ## 字节序
//!
//! 距离寄存器为大端字节序（高字节在前，0x8F 自动递增到低字节）。

pub mod codec;
pub mod constants;
pub mod registers;
pub mod report;

// 重新导出常用类型
pub use codec::*;
pub use constants::*;
pub use registers::{MeasureValue, Register};
pub use report::{RangeFinderReport, SensorType, SubsystemInfo, SubsystemKind};
