// apps/ml_cli/src/main.rs

//! MariLag 命令行界面
//!
//! 提供拉格朗日粒子追踪的命令行工具。
//!
//! # 架构层级
//!
//! 本模块属于 **Layer 5: Application**：
//! - 负责配置文件解析与日志初始化，核心只接收已解析的
//!   `ModelConfig`
//! - 通过 `Box<dyn FieldSampler>` 与数据层交互

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

/// 日志级别选项
///
/// 命令行枚举值由 clap 直接解析校验，无需字符串匹配。
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    /// 最详细
    Trace,
    /// 调试
    Debug,
    /// 常规
    Info,
    /// 仅警告
    Warn,
    /// 仅错误
    Error,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// MariLag 粒子追踪命令行工具
#[derive(Parser)]
#[command(name = "ml_cli")]
#[command(author = "MariLag Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MariLag Lagrangian particle tracker", long_about = None)]
struct Cli {
    /// 日志级别
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行内置演示场景（刚体旋转环流）
    Run(commands::run::RunArgs),
    /// 校验配置文件
    Validate(commands::validate::ValidateArgs),
    /// 显示构建信息
    Info(commands::info::InfoArgs),
}

impl Commands {
    /// 分发到对应子命令
    fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Run(args) => commands::run::execute(args),
            Self::Validate(args) => commands::validate::execute(args),
            Self::Info(args) => commands::info::execute(args),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .compact()
        .init();

    cli.command.execute()
}
