// crates/ml_config/src/lib.rs

//! MariLag Config Layer (Layer 2)
//!
//! 配置层，提供已解析的模拟配置记录。
//!
//! 核心不负责解析配置文件：外层应用（CLI）完成反序列化后，
//! 将 [`ModelConfig`] 按值传入驱动器。本层只定义结构与校验。
//!
//! # 模块概览
//!
//! - [`model_config`]: `ModelConfig` 及各节配置结构
//! - [`error`]: 配置错误类型
//!
//! # 设计原则
//!
//! 1. **无泛型**: 所有数值使用 f64
//! 2. **snake_case 枚举**: 与配置文件键值一一对应
//! 3. **启动期校验**: `validate()` 失败即终止，不进入模拟循环

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod model_config;

pub use error::ConfigError;
pub use model_config::{
    AdvectionScheme, BoundaryConditionsConfig, CoordinateSystem, DepthCoordinates,
    DiffusionScheme, GeneralConfig, HorizBoundaryKind, ModelConfig, NumMethodKind,
    NumericsConfig, SimulationConfig, VertBoundaryKind,
};
