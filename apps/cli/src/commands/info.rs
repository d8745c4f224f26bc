//! 诊断信息命令

use super::{ConnectArgs, connect};
use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use ll905_driver::PollRate;
use std::thread;
use std::time::Duration;

/// 诊断参数
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// 输出前的采集时长（毫秒）
    #[arg(short, long, default_value_t = 500)]
    pub duration_ms: u64,
}

impl InfoCommand {
    pub fn execute(&self, connect_args: &ConnectArgs, config: &CliConfig) -> Result<()> {
        let lidar = connect(connect_args, config)?;

        if self.duration_ms > 0 {
            lidar
                .set_rate(PollRate::Default)
                .context("failed to set default poll rate")?;
            thread::sleep(Duration::from_millis(self.duration_ms));
        }

        println!("{}", lidar.info());
        if let Some(report) = lidar.latest_report() {
            println!("latest:         {:.2} m @ {} us", report.distance, report.timestamp_us);
        }

        lidar.stop();
        Ok(())
    }
}
