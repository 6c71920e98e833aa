// crates/ml_foundation/src/tolerance.rs

//! 数值容差配置
//!
//! 控制粒子定位与插值中各种几何/数值判断的容差阈值。
//! 全局静态变量已被弃用，请使用参数注入模式：容差由上层
//! 构造一次，随定位器/采样器一起传递。
//!
//! # 使用建议
//!
//! - 科学计算场景使用默认值即可
//! - 可视化等容错性强的场景可使用 [`TrackingTolerance::RELAXED`]

use serde::{Deserialize, Serialize};

/// 追踪容差配置
///
/// # 字段语义
///
/// - `bary_eps`: 重心坐标内点判据，`φ ≥ -bary_eps` 视为在单元内
/// - `sigma_probe`: 垂向扩散系数导数的中心差分增量（σ 单位）
/// - `time_eps`: 时间区间端点比较容差
/// - `min_denominator`: 安全除法阈值（退化三角形、零水深）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingTolerance {
    /// 重心坐标内点判据容差
    pub bary_eps: f64,
    /// 垂向导数差分增量 [σ]
    pub sigma_probe: f64,
    /// 时间比较容差 [s]
    pub time_eps: f64,
    /// 安全除法阈值
    pub min_denominator: f64,
}

impl Default for TrackingTolerance {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl TrackingTolerance {
    /// 标准容差（默认设置）
    pub const STANDARD: Self = Self {
        bary_eps: 1e-10,
        sigma_probe: 1e-3,
        time_eps: 1e-9,
        min_denominator: 1e-12,
    };

    /// 宽松容差（适用于可视化、粗网格试算）
    pub const RELAXED: Self = Self {
        bary_eps: 1e-8,
        sigma_probe: 1e-3,
        time_eps: 1e-6,
        min_denominator: 1e-10,
    };

    /// 判断重心坐标是否满足内点判据
    #[inline]
    pub fn inside(&self, phi_min: f64) -> bool {
        phi_min >= -self.bary_eps
    }
}
