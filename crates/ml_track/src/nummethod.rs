// crates/ml_track/src/nummethod.rs

//! 数值方法组合
//!
//! 把迭代方法组合成完整的单粒子时间步：
//!
//! - [`NumMethod::Std`]: 对流与扩散位移相加后统一提交；
//! - [`NumMethod::OperatorSplit0`]: 内层 N 个对流子步逐次提交
//!   （每个子步后执行边界检查），再以整步长执行一次扩散。
//!
//! 提交序列（两种组合共用）：
//!
//! 1. 按位移试探推进；
//! 2. 宿主行走报告陆地穿越时循环应用水平边界条件重新定位，
//!    迭代上限 10 次，超出则离域；
//! 3. 开边界穿越直接离域（终态）；
//! 4. 行走失败时用全局扫描恢复一次，再失败离域；
//! 5. 应用垂向边界条件，按提交位置重算 σ 括号。
//!
//! 单粒子的 NaN 故障在此吸收（粒子离域、记录原因、运行继续）；
//! IO / 超时错误向上传递终止运行。

use glam::DVec2;
use tracing::{debug, warn};

use ml_config::{NumMethodKind, NumericsConfig};
use ml_field::{FieldError, FieldSampler};
use ml_mesh::HostQuery;

use crate::boundary::{HorizontalBoundary, VerticalBoundary, VerticalOutcome};
use crate::error::TrackError;
use crate::geo::CoordinateTransform;
use crate::itmethod::{AdvectionMethod, DiffusionMethod, StepOutcome, VerticalMode};
use crate::particle::{Delta, Particle, ParticleStatus};

/// 水平边界校正迭代上限
pub const MAX_BC_ITERS: usize = 10;

/// 单步上下文
///
/// 启动期组装一次的派发记录：采样器引用、坐标变换、边界条件。
/// 粒子扇出阶段只读共享。
pub struct StepContext<'a> {
    /// 场采样器
    pub sampler: &'a dyn FieldSampler,
    /// 水平坐标变换
    pub transform: CoordinateTransform,
    /// 垂向坐标模式
    pub vertical_mode: VerticalMode,
    /// 水平边界条件
    pub horiz_bc: HorizontalBoundary,
    /// 垂向边界条件
    pub vert_bc: VerticalBoundary,
    /// 仅表层追踪：跳过垂向扩散
    pub surface_only: bool,
}

/// 数值方法
#[derive(Debug, Clone, Copy)]
pub enum NumMethod {
    /// 单次组合：Δ ← 对流 + 扩散，统一提交
    Std {
        /// 对流方法
        adv: AdvectionMethod,
        /// 扩散方法
        diff: DiffusionMethod,
    },
    /// 算子分裂 OS0：内层对流子步逐次提交，外层扩散一步
    OperatorSplit0 {
        /// 对流方法
        adv: AdvectionMethod,
        /// 扩散方法
        diff: DiffusionMethod,
        /// 内层子步数
        n_inner: usize,
    },
}

impl NumMethod {
    /// 从数值配置节创建
    pub fn from_config(config: &NumericsConfig) -> Self {
        let adv = AdvectionMethod::from_config(config.adv_iterative_method);
        let diff = DiffusionMethod::from_config(config.diff_iterative_method);
        match config.num_method {
            NumMethodKind::Standard => Self::Std { adv, diff },
            NumMethodKind::OperatorSplit0 => Self::OperatorSplit0 {
                adv,
                diff,
                n_inner: config.n_inner_steps.max(1),
            },
        }
    }

    /// 执行一个完整时间步
    ///
    /// 粒子状态在此更新（Active → OutOfDomain / Absorbed）。
    pub fn step(
        &self,
        ctx: &StepContext<'_>,
        t: f64,
        dt: f64,
        particle: &mut Particle,
    ) -> Result<(), TrackError> {
        match self {
            Self::Std { adv, diff } => {
                let mut delta = Delta::default();

                match advect(ctx, *adv, t, dt, particle, &mut delta)? {
                    AdvectOutcome::Continue => {}
                    AdvectOutcome::Terminal => return Ok(()),
                }
                if particle.status.is_active() {
                    diffuse(ctx, *diff, t, dt, particle, &mut delta)?;
                }
                if particle.status.is_active() {
                    commit_displacement(ctx, t, dt, particle, &delta)?;
                }
                Ok(())
            }
            Self::OperatorSplit0 {
                adv,
                diff,
                n_inner,
            } => {
                let h = dt / *n_inner as f64;
                for i in 0..*n_inner {
                    if !particle.status.is_active() {
                        return Ok(());
                    }
                    let t_sub = t + i as f64 * h;
                    let mut delta = Delta::default();
                    match advect(ctx, *adv, t_sub, h, particle, &mut delta)? {
                        AdvectOutcome::Continue => {}
                        AdvectOutcome::Terminal => return Ok(()),
                    }
                    commit_displacement(ctx, t_sub, h, particle, &delta)?;
                }
                if particle.status.is_active() {
                    let mut delta = Delta::default();
                    diffuse(ctx, *diff, t, dt, particle, &mut delta)?;
                    if particle.status.is_active() {
                        commit_displacement(ctx, t, dt, particle, &delta)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// 对流子步结果：继续 / 粒子已入终态
enum AdvectOutcome {
    Continue,
    Terminal,
}

/// 执行对流，吸收单粒子数值故障
fn advect(
    ctx: &StepContext<'_>,
    adv: AdvectionMethod,
    t: f64,
    dt: f64,
    particle: &mut Particle,
    delta: &mut Delta,
) -> Result<AdvectOutcome, TrackError> {
    let outcome = adv.step(
        ctx.sampler,
        &ctx.transform,
        ctx.vertical_mode,
        t,
        dt,
        &particle.coords,
        delta,
    );
    match outcome {
        Ok(StepOutcome::Ok) => Ok(AdvectOutcome::Continue),
        Ok(StepOutcome::LandHit) | Ok(StepOutcome::DomainError) => {
            // 中间级越界：本步对流贡献置零，扩散与提交照常
            debug!(particle = particle.id, "对流中间级越界，本步对流贡献置零");
            delta.reset();
            Ok(AdvectOutcome::Continue)
        }
        Ok(StepOutcome::OpenHit) => {
            particle.status = ParticleStatus::OutOfDomain;
            Ok(AdvectOutcome::Terminal)
        }
        Err(e) => absorb_particle_fault(e, particle).map(|_| AdvectOutcome::Terminal),
    }
}

/// 执行扩散，吸收单粒子数值故障
fn diffuse(
    ctx: &StepContext<'_>,
    diff: DiffusionMethod,
    t: f64,
    dt: f64,
    particle: &mut Particle,
    delta: &mut Delta,
) -> Result<(), TrackError> {
    let result = diff.step(
        ctx.sampler,
        &ctx.transform,
        t,
        dt,
        !ctx.surface_only,
        &particle.coords,
        &mut particle.rng,
        delta,
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) => absorb_particle_fault(e, particle),
    }
}

/// 单粒子故障分流：NaN / 无宿主就地吸收，IO 故障上抛
fn absorb_particle_fault(e: FieldError, particle: &mut Particle) -> Result<(), TrackError> {
    match e {
        FieldError::NonFinite { what } => {
            warn!(particle = particle.id, what, "采样值非有限，粒子标记离域");
            particle.status = ParticleStatus::OutOfDomain;
            Ok(())
        }
        FieldError::NoHost => {
            warn!(particle = particle.id, "粒子缺少宿主，标记离域");
            particle.status = ParticleStatus::OutOfDomain;
            Ok(())
        }
        other => Err(TrackError::Field(other)),
    }
}

/// 提交位移：水平边界循环 + 垂向边界 + σ 括号重算
pub fn commit_displacement(
    ctx: &StepContext<'_>,
    t: f64,
    dt: f64,
    particle: &mut Particle,
    delta: &Delta,
) -> Result<(), TrackError> {
    let sampler = ctx.sampler;
    let old = DVec2::new(particle.coords.x, particle.coords.y);
    let mut new = DVec2::new(old.x + delta.dx, old.y + delta.dy);
    let new_z = particle.coords.z + delta.dz;

    // ---- 水平：宿主行走 + 边界校正循环 ----
    let mut query = sampler.find_host(particle.coords.host, new.x, new.y);
    let mut recovered_globally = false;
    let mut iters = 0;
    loop {
        match query {
            HostQuery::Found { elem, phi } => {
                particle.coords.x = new.x;
                particle.coords.y = new.y;
                particle.coords.host = elem;
                particle.coords.phi = phi;
                break;
            }
            HostQuery::OpenCross { .. } => {
                particle.status = ParticleStatus::OutOfDomain;
                return Ok(());
            }
            HostQuery::LandCross { elem, edge } => {
                iters += 1;
                if iters > MAX_BC_ITERS {
                    warn!(particle = particle.id, "水平边界校正超出迭代上限，粒子离域");
                    particle.status = ParticleStatus::OutOfDomain;
                    return Ok(());
                }
                let mesh = match sampler.mesh() {
                    Some(m) => m,
                    Option::None => {
                        particle.status = ParticleStatus::OutOfDomain;
                        return Ok(());
                    }
                };
                match ctx.horiz_bc.apply(mesh, &ctx.transform, old, new, elem, edge) {
                    Some(corrected) if corrected == old => {
                        // 复位：位置与宿主均退回步前状态
                        break;
                    }
                    Some(corrected) => {
                        new = corrected;
                        query = sampler.find_host(elem, new.x, new.y);
                    }
                    Option::None => {
                        particle.status = ParticleStatus::OutOfDomain;
                        return Ok(());
                    }
                }
            }
            HostQuery::SearchFailed => {
                if recovered_globally {
                    particle.status = ParticleStatus::OutOfDomain;
                    return Ok(());
                }
                recovered_globally = true;
                query = sampler.find_host_global(new.x, new.y);
            }
        }
    }

    // ---- 垂向：边界条件 + 括号重算 ----
    let t_end = t + dt;
    let zmin = sampler.get_zmin(t_end, &particle.coords);
    let zmax = sampler.get_zmax(t_end, &particle.coords);
    match ctx.vert_bc.apply(new_z, zmin, zmax) {
        VerticalOutcome::InRange(z) => {
            particle.coords.z = z;
        }
        VerticalOutcome::Absorbed => {
            particle.coords.z = zmin;
            particle.status = ParticleStatus::Absorbed;
            return Ok(());
        }
    }
    sampler.set_vertical_coordinates(&mut particle.coords);

    Ok(())
}
