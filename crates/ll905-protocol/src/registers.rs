//! 寄存器地址与命令值
//!
//! 只覆盖驱动实际使用的寄存器，其余寄存器（校准、阈值等）不在本驱动范围内。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 设备寄存器地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Register {
    /// 测量控制寄存器（写入命令值）
    Measure = 0x00,
    /// 距离高字节寄存器，读取时自动递增到低字节
    DistanceHigh = 0x8F,
}

/// 写入 `Register::Measure` 的命令值
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MeasureValue {
    /// 复位 FPGA：从内部 Flash 重新加载，所有寄存器恢复默认值
    ResetFpga = 0x00,
    /// 发起一次测量（随传感器版本可能不同）
    Acquire = 0x04,
}
