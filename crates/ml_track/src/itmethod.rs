// crates/ml_track/src/itmethod.rs

//! 迭代方法
//!
//! 单粒子单（子）步的位移贡献计算：
//!
//! - [`AdvectionMethod`]: 确定性对流（RK4 / Euler）
//! - [`DiffusionMethod`]: 随机扩散（Visser 垂向游走 + 二维水平
//!   游走，或无漂移修正的朴素游走）
//!
//! 每个方法只把**自身的**位移贡献写入 [`Delta`]；组合与提交由
//! `nummethod` 完成。方法不修改粒子本体（随机流除外）。
//!
//! # 垂向单位
//!
//! 采样器输出垂向速度为 m/s；σ 模式下此处除以全水深 `(h+ζ)`
//! 得到 dσ/dt。扩散系数已由采样器换算到垂向坐标单位制，随机
//! 游走直接使用。

use glam::{DVec2, DVec3};

use ml_config::{AdvectionScheme, DepthCoordinates, DiffusionScheme};
use ml_field::{FieldError, FieldSampler, SpatialCoords};
use ml_mesh::HostQuery;

use crate::geo::CoordinateTransform;
use crate::particle::Delta;
use crate::rng::{ParticleRng, UNIFORM_VARIANCE};

/// 迭代方法结果状态
///
/// 边界穿越不是错误：返回状态码交由外层组合逻辑处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 正常完成，位移已写入
    Ok,
    /// 中间定位越过陆地边界，位移贡献为零
    LandHit,
    /// 中间定位越过开边界，粒子应离域
    OpenHit,
    /// 中间定位失败（行走不收敛），位移贡献为零
    DomainError,
}

/// 垂向坐标模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalMode {
    /// σ 坐标：z∈[-1,0]，垂向速度需除以全水深
    Sigma,
    /// 笛卡尔坐标：z 为米
    Cartesian,
}

impl From<DepthCoordinates> for VerticalMode {
    fn from(value: DepthCoordinates) -> Self {
        match value {
            DepthCoordinates::Sigma => Self::Sigma,
            DepthCoordinates::Cartesian => Self::Cartesian,
        }
    }
}

/// 速度采样换算为网格坐标变化率
///
/// 水平分量经坐标变换（地理网格换算到度），垂向分量在 σ 模式
/// 下除以全水深。
fn grid_rate(
    sampler: &dyn FieldSampler,
    transform: &CoordinateTransform,
    mode: VerticalMode,
    t: f64,
    coords: &SpatialCoords,
) -> Result<DVec3, FieldError> {
    let vel = sampler.get_velocity(t, coords)?;
    let horizontal = transform.metres_to_grid(
        DVec2::new(vel.x, vel.y),
        DVec2::new(coords.x, coords.y),
    );
    let dz = match mode {
        VerticalMode::Cartesian => vel.z,
        VerticalMode::Sigma => {
            let depth =
                sampler.get_bathymetry(coords) + sampler.get_sea_surface_elevation(t, coords);
            if depth <= 0.0 {
                return Err(FieldError::NonFinite {
                    what: "total water depth",
                });
            }
            vel.z / depth
        }
    };
    Ok(DVec3::new(horizontal.x, horizontal.y, dz))
}

/// 将坐标平移并重新定位；返回 Found 之外的状态交调用方早退
fn relocate(
    sampler: &dyn FieldSampler,
    base: &SpatialCoords,
    dx: f64,
    dy: f64,
    dz: f64,
) -> (SpatialCoords, HostQuery) {
    let mut moved = base.moved_to(base.x + dx, base.y + dy, base.z + dz);
    let query = sampler.set_local_coordinates(&mut moved);
    (moved, query)
}

/// 把 Found 之外的定位结果映射为早退状态
fn outcome_of(query: HostQuery) -> Option<StepOutcome> {
    match query {
        HostQuery::Found { .. } => None,
        HostQuery::LandCross { .. } => Some(StepOutcome::LandHit),
        HostQuery::OpenCross { .. } => Some(StepOutcome::OpenHit),
        HostQuery::SearchFailed => Some(StepOutcome::DomainError),
    }
}

// ============================================================
// 对流
// ============================================================

/// 确定性对流方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvectionMethod {
    /// 四阶 Runge-Kutta
    Rk4,
    /// 一阶显式 Euler
    Euler,
    /// 不计算对流
    None,
}

impl AdvectionMethod {
    /// 从配置创建
    pub fn from_config(scheme: AdvectionScheme) -> Self {
        match scheme {
            AdvectionScheme::Rk4 => Self::Rk4,
            AdvectionScheme::Euler => Self::Euler,
            AdvectionScheme::None => Self::None,
        }
    }

    /// 计算对流位移贡献
    ///
    /// RK4 在 `(t, t+Δt/2, t+Δt/2, t+Δt)` 四个时刻取样，中间位置
    /// 逐级重新定位；任何一级越界则位移贡献保持为零并带状态
    /// 早退，交外层组合逻辑处理。
    pub fn step(
        &self,
        sampler: &dyn FieldSampler,
        transform: &CoordinateTransform,
        mode: VerticalMode,
        t: f64,
        dt: f64,
        coords: &SpatialCoords,
        delta: &mut Delta,
    ) -> Result<StepOutcome, FieldError> {
        match self {
            Self::None => Ok(StepOutcome::Ok),
            Self::Euler => {
                let k1 = grid_rate(sampler, transform, mode, t, coords)?;
                delta.dx += dt * k1.x;
                delta.dy += dt * k1.y;
                delta.dz += dt * k1.z;
                Ok(StepOutcome::Ok)
            }
            Self::Rk4 => {
                let half = 0.5 * dt;

                let k1 = grid_rate(sampler, transform, mode, t, coords)?;

                let (c1, q1) = relocate(sampler, coords, half * k1.x, half * k1.y, half * k1.z);
                if let Some(outcome) = outcome_of(q1) {
                    return Ok(outcome);
                }
                let k2 = grid_rate(sampler, transform, mode, t + half, &c1)?;

                let (c2, q2) = relocate(sampler, coords, half * k2.x, half * k2.y, half * k2.z);
                if let Some(outcome) = outcome_of(q2) {
                    return Ok(outcome);
                }
                let k3 = grid_rate(sampler, transform, mode, t + half, &c2)?;

                let (c3, q3) = relocate(sampler, coords, dt * k3.x, dt * k3.y, dt * k3.z);
                if let Some(outcome) = outcome_of(q3) {
                    return Ok(outcome);
                }
                let k4 = grid_rate(sampler, transform, mode, t + dt, &c3)?;

                delta.dx += dt * (k1.x + 2.0 * k2.x + 2.0 * k3.x + k4.x) / 6.0;
                delta.dy += dt * (k1.y + 2.0 * k2.y + 2.0 * k3.y + k4.y) / 6.0;
                delta.dz += dt * (k1.z + 2.0 * k2.z + 2.0 * k3.z + k4.z) / 6.0;
                Ok(StepOutcome::Ok)
            }
        }
    }
}

// ============================================================
// 扩散
// ============================================================

/// 随机扩散方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffusionMethod {
    /// Visser (1997) 良混合一致游走：漂移修正 + 中点取样
    Visser,
    /// 朴素游走：就地取样，无漂移修正（对照用）
    Naive,
    /// 不计算扩散
    None,
}

impl DiffusionMethod {
    /// 从配置创建
    pub fn from_config(scheme: DiffusionScheme) -> Self {
        match scheme {
            DiffusionScheme::Visser => Self::Visser,
            DiffusionScheme::Naive => Self::Naive,
            DiffusionScheme::None => Self::None,
        }
    }

    /// 计算扩散位移贡献
    ///
    /// 抽样顺序固定（垂向一次、水平 x/y 各一次），保证
    /// `(种子, 粒子, 步, 子步)` 的可复现性。
    pub fn step(
        &self,
        sampler: &dyn FieldSampler,
        transform: &CoordinateTransform,
        t: f64,
        dt: f64,
        include_vertical: bool,
        coords: &SpatialCoords,
        rng: &mut ParticleRng,
        delta: &mut Delta,
    ) -> Result<StepOutcome, FieldError> {
        if matches!(self, Self::None) {
            return Ok(StepOutcome::Ok);
        }

        if include_vertical {
            delta.dz += match self {
                Self::Visser => self.visser_vertical(sampler, t, dt, coords, rng)?,
                Self::Naive => {
                    let k = sampler.get_vertical_eddy_diffusivity(t, coords)?.max(0.0);
                    rng.uniform_unit() * (2.0 * k * dt / UNIFORM_VARIANCE).sqrt()
                }
                Self::None => unreachable!(),
            };
        }

        // 水平随机游走（两种方案共用）
        let grad = sampler.get_horizontal_eddy_viscosity_gradient(t, coords)?;
        let ah = sampler.get_horizontal_eddy_viscosity(t, coords)?.max(0.0);
        let amplitude = (2.0 * ah * dt / UNIFORM_VARIANCE).sqrt();
        let dx_m = grad.x * dt + rng.uniform_unit() * amplitude;
        let dy_m = grad.y * dt + rng.uniform_unit() * amplitude;
        let d = transform.metres_to_grid(DVec2::new(dx_m, dy_m), DVec2::new(coords.x, coords.y));
        delta.dx += d.x;
        delta.dy += d.y;

        Ok(StepOutcome::Ok)
    }

    /// Visser 垂向游走
    ///
    /// `z* = z + ½·k'·Δt`（越界反射回域内），`k` 在 z* 处取样：
    /// `dz = k'·Δt + R·√(2·k(z*)·Δt / r)`。
    fn visser_vertical(
        &self,
        sampler: &dyn FieldSampler,
        t: f64,
        dt: f64,
        coords: &SpatialCoords,
        rng: &mut ParticleRng,
    ) -> Result<f64, FieldError> {
        let k_prime = sampler.get_vertical_eddy_diffusivity_derivative(t, coords)?;
        let zmin = sampler.get_zmin(t, coords);
        let zmax = sampler.get_zmax(t, coords);

        let mut z_star = coords.z + 0.5 * k_prime * dt;
        if z_star > zmax {
            z_star = 2.0 * zmax - z_star;
        } else if z_star < zmin {
            z_star = 2.0 * zmin - z_star;
        }
        z_star = z_star.clamp(zmin, zmax);

        let mut probe = *coords;
        probe.z = z_star;
        sampler.set_vertical_coordinates(&mut probe);
        let k_mid = sampler.get_vertical_eddy_diffusivity(t, &probe)?.max(0.0);

        Ok(k_prime * dt + rng.uniform_unit() * (2.0 * k_mid * dt / UNIFORM_VARIANCE).sqrt())
    }
}
