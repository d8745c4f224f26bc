//! 自检命令
//!
//! 1. 手动模式读取一次
//! 2. 切换到 2 Hz，等待并读取若干份报告
//! 3. 恢复默认采样率

use super::{ConnectArgs, connect, print_report};
use crate::config::CliConfig;
use anyhow::{Context, Result, bail};
use clap::Args;
use ll905_driver::PollRate;
use std::time::Duration;

/// 自检参数
#[derive(Args, Debug)]
pub struct TestCommand {
    /// 周期模式下读取的报告数
    #[arg(short = 'n', long, default_value_t = 5)]
    pub samples: usize,
}

impl TestCommand {
    pub fn execute(&self, connect_args: &ConnectArgs, config: &CliConfig) -> Result<()> {
        let lidar = connect(connect_args, config)?;

        let reports = lidar.read(1).context("immediate read failed")?;
        println!("single read");
        for report in &reports {
            print_report(report);
        }

        lidar
            .set_rate(PollRate::Hz(2))
            .context("failed to set 2Hz poll rate")?;

        for i in 0..self.samples {
            if !lidar.wait_for_report(Duration::from_secs(2)) {
                bail!("timed out waiting for sensor data");
            }

            let reports = lidar.read(1).context("periodic read failed")?;
            println!("periodic read {}", i);
            for report in &reports {
                print_report(report);
            }
        }

        lidar
            .set_rate(PollRate::Default)
            .context("failed to set default poll rate")?;

        println!("PASS");
        Ok(())
    }
}
