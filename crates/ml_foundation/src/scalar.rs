// crates/ml_foundation/src/scalar.rs

//! 统一标量类型
//!
//! 粒子追踪全程使用双精度：宿主单元行走与重心坐标判定对
//! 浮点精度敏感，f32 在大坐标（UTM 东距 ~1e6 m）下会丢失
//! 亚米级位置信息。

/// 计算用标量类型
pub type Scalar = f64;

/// 无效索引哨兵值
///
/// 用于宿主单元等"尚未定位"的场合。
pub const INVALID_INDEX: usize = usize::MAX;
