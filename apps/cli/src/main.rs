//! # LL905 CLI
//!
//! LL905 激光测距模块的命令行工具。
//!
//! ```bash
//! # 以 5 Hz 采集并输出报告，Ctrl-C 退出
//! ll905 start --rate 5
//!
//! # 自检：一次手动测量 + 5 次 2 Hz 周期采集
//! ll905 test
//!
//! # 无硬件运行（仿真设备）
//! ll905 --simulate info
//! ```
//!
//! 默认配置从 `<config_dir>/ll905/config.toml` 读取，命令行参数优先。
//!
//! 每个命令独立创建驱动实例，进程退出即释放设备，因此没有单独的 `stop` 命令：
//! `start` 通过 Ctrl-C 停止采集并输出诊断计数。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

use commands::{ConnectArgs, InfoCommand, ResetCommand, StartCommand, TestCommand};
use config::CliConfig;

/// LL905 CLI - 激光测距命令行工具
#[derive(Parser, Debug)]
#[command(name = "ll905")]
#[command(about = "Command-line interface for LL905 laser range finders", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 启动周期采集并持续输出报告
    Start {
        #[command(flatten)]
        args: StartCommand,
    },

    /// 自检（手动测量 + 周期采集）
    Test {
        #[command(flatten)]
        args: TestCommand,
    },

    /// 请求复位，然后恢复默认采样率
    Reset {
        #[command(flatten)]
        args: ResetCommand,
    },

    /// 输出驱动诊断信息
    Info {
        #[command(flatten)]
        args: InfoCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ll905_cli=info,ll905_driver=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load_default()?;

    match cli.command {
        Commands::Start { args } => args.execute(&cli.connect, &config),
        Commands::Test { args } => args.execute(&cli.connect, &config),
        Commands::Reset { args } => args.execute(&cli.connect, &config),
        Commands::Info { args } => args.execute(&cli.connect, &config),
    }
}
