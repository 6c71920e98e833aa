// apps/ml_cli/src/commands/info.rs

//! 显示构建信息

use anyhow::Result;
use clap::Args;

/// 信息参数
#[derive(Args)]
pub struct InfoArgs {
    /// 显示详细能力列表
    #[arg(long)]
    pub detailed: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    println!("MariLag v{}", env!("CARGO_PKG_VERSION"));
    println!("离线拉格朗日粒子追踪引擎");

    if args.detailed {
        println!();
        println!("对流方法:   rk4, euler, none");
        println!("扩散方法:   visser, naive, none");
        println!("组合方式:   standard, operator_split_0");
        println!("水平边界:   reflecting, restoring, none");
        println!("垂向边界:   reflecting, absorbing_bottom, none");
        println!("垂向坐标:   sigma, cartesian");
        println!("水平坐标:   cartesian, geographic");
        println!("采样器:     unstructured (FVCOM), column (GOTM), analytic");
    }
    Ok(())
}
