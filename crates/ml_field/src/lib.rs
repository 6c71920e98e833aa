// crates/ml_field/src/lib.rs

//! MariLag Field Layer (Layer 3)
//!
//! 时变欧拉场的快照管理、插值核与任意 `(t, x, y, z)` 处的
//! 采样接口。
//!
//! # 模块概览
//!
//! - [`coords`]: [`SpatialCoords`] 粒子空间坐标与网格缓存（宿主、
//!   重心坐标、σ 层括号）
//! - [`kernels`]: 三角形内 / 时间 / σ 方向的插值原语，LLS 与
//!   Shepard 水平插值
//! - [`frames`]: [`FieldFrame`] 单时刻场快照与 [`FrameBuffer`]
//!   双缓冲时间框架
//! - [`sampler`]: [`FieldSampler`] 能力集——核心与 IO 层之间的
//!   唯一接口
//! - [`unstructured`]: FVCOM 风格交错布置的非结构网格采样器
//! - [`column`]: GOTM 风格一维水柱采样器（笛卡尔垂向）
//! - [`analytic`]: 闭包驱动的解析采样器（测试与演示）
//!
//! # 交错布置约定
//!
//! `u, v` 定义在单元中心、σ 层中心；`ω, k_h` 在节点、σ 层界面；
//! `ζ` 在节点；`A_h` 在节点、σ 层中心。节点-界面与中心-层的
//! 插值路径保持分离：混用会在边界附近损失精度并破坏质量守恒。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analytic;
pub mod column;
pub mod coords;
pub mod error;
pub mod frames;
pub mod kernels;
pub mod sampler;
pub mod unstructured;

pub use analytic::AnalyticFieldSource;
pub use column::{ColumnFieldSource, DiffusivityProfile};
pub use coords::SpatialCoords;
pub use error::FieldError;
pub use frames::{FieldFrame, FrameBuffer, InMemorySnapshots, SnapshotProvider};
pub use sampler::FieldSampler;
pub use unstructured::UnstructuredFieldSource;
