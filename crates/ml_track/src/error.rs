// crates/ml_track/src/error.rs

//! 追踪层错误类型
//!
//! 只有致命错误通过本类型向上传递：数据源故障与配置故障。
//! 单粒子的边界穿越与数值故障（NaN）在驱动器内就地吸收，
//! 粒子标记离域后运行继续。

use ml_config::ConfigError;
use ml_field::FieldError;

/// 追踪错误
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// 配置校验失败（启动期致命）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 场数据源故障（IO / 超时，致命）
    #[error("场数据错误: {0}")]
    Field(#[from] FieldError),

    /// 所有种子粒子均在计算域外
    #[error("所有种子粒子均在计算域外")]
    AllSeedsOutsideDomain,

    /// 种子粒子垂向位置越界
    #[error("种子粒子 {id} 垂向位置 {z} 超出 [{zmin}, {zmax}]")]
    SeedOutsideVerticalRange {
        /// 粒子 id
        id: u64,
        /// 种子垂向位置
        z: f64,
        /// 垂向下界
        zmin: f64,
        /// 垂向上界
        zmax: f64,
    },

    /// 尚未播种即要求步进
    #[error("粒子数组为空，请先调用 seed()")]
    NotSeeded,
}
