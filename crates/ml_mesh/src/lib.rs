// crates/ml_mesh/src/lib.rs

//! MariLag Mesh Layer (Layer 2)
//!
//! 非结构三角网格的拓扑存储、重心坐标查询与宿主单元定位。
//!
//! # 模块概览
//!
//! - [`topology`]: [`TriMesh`] 不可变网格数据（节点、单元、邻接、σ 分层）
//! - [`locator`]: 重心坐标计算与局部行走/全局扫描宿主定位
//! - [`generation`]: 测试与演示用的矩形三角网格生成
//! - [`error`]: 网格错误类型
//!
//! # 设计原则
//!
//! 1. **加载后不可变**: `TriMesh` 构造时一次性校验邻接不变量
//! 2. **哨兵邻接**: `nbe` 中 `-1` 表示陆地边界，`-2` 表示开边界
//! 3. **容差注入**: 内点判据容差来自 `ml_foundation`，不使用全局状态

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod generation;
pub mod locator;
pub mod topology;

pub use error::MeshError;
pub use locator::{barycentric, reconstruct_position, HostLocator, HostQuery, WalkLimits};
pub use topology::{TriMesh, LAND, OPEN};
