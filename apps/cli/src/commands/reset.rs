//! 复位命令

use super::{ConnectArgs, connect};
use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use ll905_driver::PollRate;
use tracing::warn;

/// 复位参数
#[derive(Args, Debug)]
pub struct ResetCommand {
    /// 直接向设备发送复位命令
    #[arg(long)]
    pub device: bool,
}

impl ResetCommand {
    pub fn execute(&self, connect_args: &ConnectArgs, config: &CliConfig) -> Result<()> {
        let lidar = connect(connect_args, config)?;

        let result = if self.device {
            lidar.reset_device()
        } else {
            lidar.reset()
        };

        if let Err(ref e) = result {
            warn!("reset request failed: {}", e);
        }

        lidar
            .set_rate(PollRate::Default)
            .context("driver poll restart failed")?;

        result.context("driver reset failed")?;
        println!("✅ 复位完成");
        Ok(())
    }
}
