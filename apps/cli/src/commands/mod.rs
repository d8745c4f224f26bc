//! 命令定义和实现

pub mod info;
pub mod reset;
pub mod selftest;
pub mod start;

pub use info::InfoCommand;
pub use reset::ResetCommand;
pub use selftest::TestCommand;
pub use start::StartCommand;

use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use ll905_driver::{Ll905, Ll905Builder, RangeFinderReport};
use ll905_i2c::SimulatedLidar;

/// 连接参数（覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// I2C 总线编号（/dev/i2c-N）
    #[arg(short, long, global = true)]
    pub bus: Option<u32>,

    /// 设备地址（十进制或 0x 前缀十六进制）
    #[arg(short, long, global = true, value_parser = parse_address)]
    pub address: Option<u16>,

    /// 使用仿真设备（无需硬件）
    #[arg(long, global = true)]
    pub simulate: bool,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|_| format!("invalid address '{}'", s))
}

/// 仿真设备：在 1.5 m 到 3.5 m 之间缓慢往返
fn simulated_device(address: u16) -> SimulatedLidar {
    let sim = SimulatedLidar::new(address, 250);
    sim.push_distances_cm((0..400u16).map(|i| 150 + if i < 200 { i } else { 400 - i }));
    sim
}

/// 按参数和配置创建驱动实例（手动模式）
pub fn connect(args: &ConnectArgs, config: &CliConfig) -> Result<Ll905> {
    let mut driver = config.driver.clone();
    if let Some(address) = args.address {
        driver.address = address;
    }
    let bus = args.bus.unwrap_or(config.bus);

    let mut builder = Ll905Builder::new().i2c_bus(bus).config(driver.clone());
    if args.simulate {
        builder = builder.transport(Box::new(simulated_device(driver.address)));
        println!("🧪 使用仿真设备 (0x{:02X})", driver.address);
    } else {
        println!("🔌 连接 /dev/i2c-{} (0x{:02X})...", bus, driver.address);
    }

    builder.build().context("driver init failed")
}

pub fn print_report(report: &RangeFinderReport) {
    println!(
        "{:>12} us  {:>6.2} m  {}",
        report.timestamp_us,
        report.distance,
        if report.valid { "valid" } else { "out of range" }
    );
}
