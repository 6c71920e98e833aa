// crates/ml_track/src/lib.rs

//! MariLag Track Layer (Layer 4)
//!
//! 拉格朗日粒子追踪的状态机、迭代方法、边界条件与模型驱动器。
//!
//! # 模块概览
//!
//! - [`particle`]: 粒子状态机、位移累加器、诊断快照
//! - [`rng`]: 粒子独立随机数流（可复现）
//! - [`itmethod`]: 对流（RK4 / Euler）与扩散（Visser / 朴素）
//!   迭代方法
//! - [`nummethod`]: Std / 算子分裂组合与位移提交序列
//! - [`boundary`]: 水平反射/复位、垂向反射/底部吸收
//! - [`geo`]: 水平坐标变换（地理网格切平面）
//! - [`driver`]: [`Model`] 驱动器——播种、步进、并行扇出、诊断
//!
//! # 每步控制流
//!
//! ```text
//! driver → numMethod → itMethod(s) → fieldSampler → locator + kernels
//! ```
//!
//! 驱动器合计位移、执行边界循环、提交状态。粒子间数据并行
//! （rayon），时间步之间串行协调。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod driver;
pub mod error;
pub mod geo;
pub mod itmethod;
pub mod nummethod;
pub mod particle;
pub mod rng;

pub use boundary::{HorizontalBoundary, VerticalBoundary, VerticalOutcome};
pub use driver::{Model, ParticleSeed};
pub use error::TrackError;
pub use geo::CoordinateTransform;
pub use itmethod::{AdvectionMethod, DiffusionMethod, StepOutcome, VerticalMode};
pub use nummethod::{NumMethod, StepContext, MAX_BC_ITERS};
pub use particle::{Delta, Particle, ParticleDiagnostics, ParticleStatus, StepSummary};
pub use rng::{ParticleRng, UNIFORM_VARIANCE};
