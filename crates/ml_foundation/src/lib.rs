// crates/ml_foundation/src/lib.rs

//! MariLag Foundation Layer (Layer 1)
//!
//! 零依赖基础层，提供整个项目的基础抽象。
//!
//! # 模块概览
//!
//! - [`scalar`]: 计算用标量类型别名
//! - [`tolerance`]: 数值容差配置
//!
//! # 设计原则
//!
//! 1. **零外部依赖**: 仅依赖 serde
//! 2. **无全局状态**: 容差通过参数注入，不使用静态变量
//! 3. **上层无关**: 禁止引入网格、场、粒子等领域概念

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod scalar;
pub mod tolerance;

pub use scalar::Scalar;
pub use tolerance::TrackingTolerance;
