//! 周期采集命令

use super::{ConnectArgs, connect, print_report};
use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use ll905_driver::{DriverError, PollRate};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// 周期采集参数
#[derive(Args, Debug)]
pub struct StartCommand {
    /// 采样率（Hz、default 或 max）
    #[arg(short, long, value_parser = parse_periodic_rate)]
    pub rate: Option<PollRate>,

    /// 报告队列深度（1..=100）
    #[arg(short, long)]
    pub queue_depth: Option<usize>,
}

/// 只接受周期采样率：手动模式下没有调度中的 tick，`start` 的等待循环不会收到报告
fn parse_periodic_rate(s: &str) -> Result<PollRate, String> {
    match s.parse::<PollRate>()? {
        PollRate::Manual | PollRate::External => {
            Err(format!("'{}' is not a periodic poll rate", s.trim()))
        },
        rate => rate.interval().map(|_| rate).map_err(|e| e.to_string()),
    }
}

impl StartCommand {
    pub fn execute(&self, connect_args: &ConnectArgs, config: &CliConfig) -> Result<()> {
        let lidar = connect(connect_args, config)?;

        if let Some(depth) = self.queue_depth {
            lidar.set_queue_depth(depth).context("failed to set queue depth")?;
        }

        let rate = self.rate.unwrap_or(PollRate::Default);
        lidar.set_rate(rate).context("failed to set poll rate")?;
        println!("▶️  采集中 ({})，按 Ctrl-C 退出", rate);

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("failed to install Ctrl-C handler")?;

        let batch = lidar.get_queue_depth();
        while running.load(Ordering::SeqCst) {
            if !lidar.wait_for_report(Duration::from_millis(200)) {
                continue;
            }

            match lidar.read(batch) {
                Ok(reports) => reports.iter().for_each(print_report),
                Err(DriverError::NoData) => {},
                Err(e) => warn!("read failed: {}", e),
            }
        }

        lidar.stop();
        println!("\n{}", lidar.metrics());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_periodic_rate() {
        assert_eq!(parse_periodic_rate("default"), Ok(PollRate::Default));
        assert_eq!(parse_periodic_rate("max"), Ok(PollRate::Max));
        assert_eq!(parse_periodic_rate("5"), Ok(PollRate::Hz(5)));
        assert_eq!(parse_periodic_rate("2Hz"), Ok(PollRate::Hz(2)));
    }

    #[test]
    fn test_parse_periodic_rate_rejects_non_periodic() {
        for rate in ["manual", "external", "0", "20", "fast"] {
            assert!(parse_periodic_rate(rate).is_err(), "{} accepted", rate);
        }
    }
}
