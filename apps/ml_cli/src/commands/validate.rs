// apps/ml_cli/src/commands/validate.rs

//! 校验配置文件
//!
//! 解析 TOML 配置为 `ModelConfig` 并执行启动期校验。核心不做
//! 文件 IO，解析与报错都发生在本层。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{error, info};

use ml_config::ModelConfig;

/// 校验参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,
}

/// 执行校验命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("无法读取配置文件 {}", args.config.display()))?;
    let config: ModelConfig = toml::from_str(&text).context("配置解析失败")?;

    match config.validate() {
        Ok(()) => {
            info!(
                time_step = config.simulation.time_step,
                n_steps = config.n_time_steps(),
                num_method = ?config.numerics.num_method,
                "配置校验通过"
            );
            Ok(())
        }
        Err(e) => {
            error!("配置校验失败: {}", e);
            Err(e.into())
        }
    }
}
