// crates/ml_field/src/sampler.rs

//! 场采样能力集
//!
//! [`FieldSampler`] 是核心与数据层之间的唯一接口：给定时刻与
//! 粒子坐标缓存，回答速度、扩散系数、粘性及其梯度、垂向范围
//! 等查询。实现包括 FVCOM 风格非结构采样器、GOTM 风格一维
//! 水柱采样器与解析采样器；文件格式适配器在核心之外实现同一
//! 接口。
//!
//! # 调用协议
//!
//! 1. 每个时间步开始时驱动器独占调用一次 [`read_data`]
//!    （可能推进快照框架，相对粒子更新原子）；
//! 2. 粒子扇出阶段只调用 `&self` 查询；所有取值函数假定
//!    [`set_local_coordinates`] 已填充坐标缓存。
//!
//! # 单位约定
//!
//! 返回值使用积分器所处垂向坐标的单位：σ 模式下垂向速度按
//! `(h+ζ)` 放缩为 m/s、扩散系数按 `(h+ζ)²` 换算到 σ²/s；笛卡尔
//! 模式（水柱）不做换算。
//!
//! [`read_data`]: FieldSampler::read_data
//! [`set_local_coordinates`]: FieldSampler::set_local_coordinates

use glam::{DVec2, DVec3};

use crate::coords::SpatialCoords;
use crate::error::FieldError;
use ml_mesh::{HostQuery, TriMesh};

/// 场采样能力集
///
/// `Send + Sync`：粒子扇出阶段在工作线程间共享只读引用。
pub trait FieldSampler: Send + Sync {
    /// 推进读取框架使其覆盖时刻 t；已覆盖时为无操作
    fn read_data(&mut self, t: f64) -> Result<(), FieldError>;

    /// 从 `start_host` 出发局部行走定位 `(x, y)`
    fn find_host(&self, start_host: usize, x: f64, y: f64) -> HostQuery;

    /// 全局扫描定位（播种、行走失败恢复）
    fn find_host_global(&self, x: f64, y: f64) -> HostQuery;

    /// 填充坐标缓存（宿主、重心坐标、σ 括号）
    ///
    /// 返回 `Found` 时缓存已更新；返回边界穿越/失败时缓存保持
    /// 原状，由调用方决定边界处理。
    fn set_local_coordinates(&self, coords: &mut SpatialCoords) -> HostQuery;

    /// 仅按当前 z 重算垂向括号（水平缓存不变）
    fn set_vertical_coordinates(&self, coords: &mut SpatialCoords);

    /// 速度 `(u, v, w)` [m/s]
    fn get_velocity(&self, t: f64, coords: &SpatialCoords) -> Result<DVec3, FieldError>;

    /// 垂向涡扩散系数（垂向坐标单位制）
    fn get_vertical_eddy_diffusivity(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError>;

    /// 垂向涡扩散系数对 z 的导数（中心差分，边界处内翻探测点）
    fn get_vertical_eddy_diffusivity_derivative(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError>;

    /// 水平涡粘性 A_h [m²/s]
    fn get_horizontal_eddy_viscosity(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError>;

    /// 水平涡粘性梯度 `(∂A/∂x, ∂A/∂y)`（单元常值线性基闭式）
    fn get_horizontal_eddy_viscosity_gradient(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<DVec2, FieldError>;

    /// 垂向下界（σ 模式 -1；笛卡尔模式 -h(x,y)）
    fn get_zmin(&self, t: f64, coords: &SpatialCoords) -> f64;

    /// 垂向上界（σ 模式 0；笛卡尔模式 ζ(t,x,y)）
    fn get_zmax(&self, t: f64, coords: &SpatialCoords) -> f64;

    /// 静水深 h [m]（向下为正）
    fn get_bathymetry(&self, coords: &SpatialCoords) -> f64;

    /// 海面高度 ζ [m]
    fn get_sea_surface_elevation(&self, t: f64, coords: &SpatialCoords) -> f64;

    /// 单元是否为湿（搁浅判定）
    fn is_wet(&self, t: f64, elem: usize) -> bool;

    /// 底层网格（无网格采样器返回 None，水平边界条件退化）
    fn mesh(&self) -> Option<&TriMesh> {
        None
    }
}
