// crates/ml_track/src/driver.rs

//! 模型驱动器
//!
//! 持有粒子数组并推进模拟：
//!
//! 1. 每个时间步开始串行调用 `read_data`（快照推进相对粒子
//!    更新原子）；
//! 2. rayon 在粒子上扇出，各工作线程只变更自己的粒子，对网格
//!    与快照只读；
//! 3. 汇合屏障处合并各线程的诊断缓冲；
//! 4. 步间检查协作取消标志。
//!
//! 时间约定：驱动器内部使用相对 `start_datetime` 的秒数，
//! `t_n = n·Δt`；快照提供者的时刻使用同一基准。
//!
//! 种子向量在播种后保留，`reseed` 以同一批种子重新播种
//! （集合实验）；配合相同的模拟种子可得到逐位一致的复播。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use ml_config::ModelConfig;
use ml_field::FieldSampler;

use crate::boundary::{HorizontalBoundary, VerticalBoundary};
use crate::error::TrackError;
use crate::geo::CoordinateTransform;
use crate::itmethod::VerticalMode;
use crate::nummethod::{NumMethod, StepContext};
use crate::particle::{Particle, ParticleDiagnostics, ParticleStatus, StepSummary};

/// 粒子种子
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSeed {
    /// 释放批次
    pub group_id: u32,
    /// 初始 x
    pub x: f64,
    /// 初始 y
    pub y: f64,
    /// 初始垂向位置（垂向坐标单位）
    pub z: f64,
}

/// 模型驱动器
pub struct Model {
    config: ModelConfig,
    sampler: Box<dyn FieldSampler>,
    num_method: NumMethod,
    transform: CoordinateTransform,
    vertical_mode: VerticalMode,
    horiz_bc: HorizontalBoundary,
    vert_bc: VerticalBoundary,
    particles: Vec<Particle>,
    seeds: Vec<ParticleSeed>,
    sim_seed: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl Model {
    /// 创建驱动器
    ///
    /// 配置在此一次性校验；迭代方法与边界条件的派发记录也在
    /// 此组装，热路径上不再做字符串匹配或动态选择。
    pub fn new(config: ModelConfig, sampler: Box<dyn FieldSampler>) -> Result<Self, TrackError> {
        config.validate()?;
        let num_method = NumMethod::from_config(&config.numerics);
        let transform = CoordinateTransform::new(config.simulation.coordinate_system);
        let vertical_mode = VerticalMode::from(config.simulation.depth_coordinates);
        let horiz_bc = HorizontalBoundary::from_config(config.boundary_conditions.horiz_bound_cond);
        let vert_bc = VerticalBoundary::from_config(config.boundary_conditions.vert_bound_cond);
        Ok(Self {
            config,
            sampler,
            num_method,
            transform,
            vertical_mode,
            horiz_bc,
            vert_bc,
            particles: Vec::new(),
            seeds: Vec::new(),
            sim_seed: 0,
            cancel: None,
        })
    }

    /// 设置模拟种子（随机流基准）
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sim_seed = seed;
        self
    }

    /// 注入协作取消标志（步间检查）
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    /// 设置粒子种子数据（覆盖已有种子）
    pub fn set_particle_data(&mut self, seeds: Vec<ParticleSeed>) {
        self.seeds = seeds;
    }

    /// 在时刻 t 播种
    ///
    /// 所有种子均在域外时报错；单个域外种子只标记离域。
    /// 垂向位置越出 `[zmin, zmax]` 的种子视为无效输入。
    pub fn seed(&mut self, t: f64) -> Result<(), TrackError> {
        self.particles.clear();
        let mut n_located = 0usize;

        for (idx, seed) in self.seeds.iter().enumerate() {
            let mut particle = Particle::new(
                idx as u64,
                seed.group_id,
                seed.x,
                seed.y,
                seed.z,
                self.sim_seed,
            );
            let query = self.sampler.set_local_coordinates(&mut particle.coords);
            if query.is_found() {
                let zmin = self.sampler.get_zmin(t, &particle.coords);
                let zmax = self.sampler.get_zmax(t, &particle.coords);
                if seed.z < zmin - 1e-12 || seed.z > zmax + 1e-12 {
                    return Err(TrackError::SeedOutsideVerticalRange {
                        id: idx as u64,
                        z: seed.z,
                        zmin,
                        zmax,
                    });
                }
                n_located += 1;
            } else {
                warn!(particle = idx, "种子粒子在计算域外，标记离域");
                particle.status = ParticleStatus::OutOfDomain;
            }
            self.particles.push(particle);
        }

        if !self.seeds.is_empty() && n_located == 0 {
            return Err(TrackError::AllSeedsOutsideDomain);
        }
        info!(
            n_particles = self.particles.len(),
            n_located, "粒子播种完成"
        );
        Ok(())
    }

    /// 以保留的种子向量重新播种（集合复播）
    pub fn reseed(&mut self, t: f64) -> Result<(), TrackError> {
        self.seed(t)
    }

    /// 推进一个时间步
    ///
    /// `t` 为本步起始时刻（相对秒）。返回合并后的状态汇总。
    pub fn step(&mut self, t: f64) -> Result<StepSummary, TrackError> {
        if self.particles.is_empty() {
            return Err(TrackError::NotSeeded);
        }
        // 串行快照推进：粒子扇出开始前完成
        self.sampler.read_data(t)?;

        let dt = self.config.simulation.time_step;
        let ctx = StepContext {
            sampler: self.sampler.as_ref(),
            transform: self.transform,
            vertical_mode: self.vertical_mode,
            horiz_bc: self.horiz_bc,
            vert_bc: self.vert_bc,
            surface_only: self.config.simulation.surface_only,
        };
        let num_method = self.num_method;
        let config = &self.config;

        self.particles
            .par_iter_mut()
            .map(|particle| {
                step_particle(&ctx, &num_method, config, t, dt, particle)?;
                Ok(StepSummary::of(particle))
            })
            .try_reduce(StepSummary::default, |a, b| Ok(a.merged(b)))
    }

    /// 运行完整模拟
    ///
    /// 步间检查取消标志；每约 10% 进度输出一条日志。
    pub fn run(&mut self) -> Result<StepSummary, TrackError> {
        let n_steps = self.config.n_time_steps();
        let dt = self.config.simulation.time_step;
        let log_every = (n_steps / 10).max(1);

        let mut summary = StepSummary::default();
        for n in 0..n_steps {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    info!(step = n, "收到取消请求，模拟提前结束");
                    return Ok(summary);
                }
            }
            let t = n as f64 * dt;
            summary = self.step(t)?;
            if n % log_every == 0 {
                info!(
                    step = n,
                    t,
                    n_active = summary.n_active,
                    n_out = summary.n_out_of_domain,
                    n_beached = summary.n_beached,
                    n_absorbed = summary.n_absorbed,
                    "模拟进度"
                );
            }
        }
        info!(n_steps, "模拟完成");
        Ok(summary)
    }

    /// 当前时刻的粒子诊断快照
    ///
    /// 离域粒子不再计入诊断。
    pub fn get_diagnostics(&self, t: f64) -> Vec<ParticleDiagnostics> {
        self.particles
            .iter()
            .filter(|p| p.status != ParticleStatus::OutOfDomain)
            .map(|p| {
                let h = self.sampler.get_bathymetry(&p.coords);
                let zeta = self.sampler.get_sea_surface_elevation(t, &p.coords);
                ParticleDiagnostics {
                    id: p.id,
                    group_id: p.group_id,
                    x1: p.coords.x,
                    x2: p.coords.y,
                    x3: p.coords.z,
                    host: p.coords.host,
                    h,
                    zeta,
                    status: p.status,
                }
            })
            .collect()
    }

    /// 粒子数组只读视图（测试与诊断）
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// 配置引用
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

/// 单粒子完整时间步（状态机 + 数值方法 + 步后约束）
fn step_particle(
    ctx: &StepContext<'_>,
    num_method: &NumMethod,
    config: &ModelConfig,
    t: f64,
    dt: f64,
    particle: &mut Particle,
) -> Result<(), TrackError> {
    if particle.status.is_terminal() {
        return Ok(());
    }

    // 搁浅粒子：等待宿主复湿
    if particle.is_beached() {
        if ctx.sampler.is_wet(t, particle.coords.host) {
            particle.status = ParticleStatus::Active;
        } else {
            return Ok(());
        }
    }

    num_method.step(ctx, t, dt, particle)?;
    if !particle.status.is_active() {
        return Ok(());
    }

    let t_end = t + dt;

    // 搁浅判定：提交后的宿主为干
    if config.simulation.allow_beaching && !ctx.sampler.is_wet(t_end, particle.coords.host) {
        particle.status = ParticleStatus::Beached;
        return Ok(());
    }

    apply_vertical_constraints(ctx, config, t_end, particle);
    Ok(())
}

/// 步后垂向约束：仅表层 / 定深 / 定高
fn apply_vertical_constraints(
    ctx: &StepContext<'_>,
    config: &ModelConfig,
    t: f64,
    particle: &mut Particle,
) {
    let sim = &config.simulation;
    if !(sim.surface_only || sim.depth_restoring || sim.height_restoring) {
        return;
    }

    let sampler = ctx.sampler;
    let zmin = sampler.get_zmin(t, &particle.coords);
    let zmax = sampler.get_zmax(t, &particle.coords);

    let target = if sim.surface_only {
        zmax
    } else {
        let h = sampler.get_bathymetry(&particle.coords);
        let zeta = sampler.get_sea_surface_elevation(t, &particle.coords);
        let depth = (h + zeta).max(1e-12);
        match ctx.vertical_mode {
            VerticalMode::Sigma => {
                if sim.depth_restoring {
                    // σ = fixed_depth / (h+ζ)，fixed_depth ≤ 0
                    sim.fixed_depth.unwrap_or(0.0) / depth
                } else {
                    // σ = -1 + fixed_height / (h+ζ)
                    -1.0 + sim.fixed_height.unwrap_or(0.0) / depth
                }
            }
            VerticalMode::Cartesian => {
                if sim.depth_restoring {
                    zeta + sim.fixed_depth.unwrap_or(0.0)
                } else {
                    -h + sim.fixed_height.unwrap_or(0.0)
                }
            }
        }
    };

    particle.coords.z = target.clamp(zmin, zmax);
    sampler.set_vertical_coordinates(&mut particle.coords);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use glam::DVec3;
    use ml_config::*;
    use ml_field::AnalyticFieldSource;
    use std::sync::Arc;

    fn base_config(dt: f64, n_seconds: i64) -> ModelConfig {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ModelConfig {
            simulation: SimulationConfig {
                time_step: dt,
                start_datetime: start,
                end_datetime: start + chrono::Duration::seconds(n_seconds),
                depth_coordinates: DepthCoordinates::Cartesian,
                coordinate_system: CoordinateSystem::Cartesian,
                surface_only: false,
                depth_restoring: false,
                fixed_depth: None,
                height_restoring: false,
                fixed_height: None,
                allow_beaching: false,
            },
            numerics: NumericsConfig {
                diff_iterative_method: DiffusionScheme::None,
                ..Default::default()
            },
            boundary_conditions: BoundaryConditionsConfig::default(),
            general: GeneralConfig::default(),
        }
    }

    fn uniform_source() -> Box<AnalyticFieldSource> {
        Box::new(
            AnalyticFieldSource::new(Arc::new(|_t, _x, _y, _z| DVec3::new(1.0, 0.0, 0.0)))
                .with_vertical_range(-10.0, 0.0),
        )
    }

    #[test]
    fn test_seed_and_step() {
        let mut model = Model::new(base_config(1.0, 10), uniform_source()).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: -5.0,
        }]);
        model.seed(0.0).unwrap();
        let summary = model.step(0.0).unwrap();
        assert_eq!(summary.n_active, 1);
        assert!((model.particles()[0].coords.x - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_step_before_seed_rejected() {
        let mut model = Model::new(base_config(1.0, 10), uniform_source()).unwrap();
        assert!(matches!(model.step(0.0), Err(TrackError::NotSeeded)));
    }

    #[test]
    fn test_seed_above_surface_rejected() {
        let mut model = Model::new(base_config(1.0, 10), uniform_source()).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: 0.5,
        }]);
        assert!(matches!(
            model.seed(0.0),
            Err(TrackError::SeedOutsideVerticalRange { .. })
        ));
    }

    #[test]
    fn test_seed_below_floor_rejected() {
        let mut model = Model::new(base_config(1.0, 10), uniform_source()).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: -10.5,
        }]);
        assert!(matches!(
            model.seed(0.0),
            Err(TrackError::SeedOutsideVerticalRange { .. })
        ));
    }

    #[test]
    fn test_run_full_simulation() {
        let mut model = Model::new(base_config(0.5, 20), uniform_source()).unwrap();
        model.set_particle_data(vec![
            ParticleSeed {
                group_id: 1,
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            ParticleSeed {
                group_id: 1,
                x: 5.0,
                y: 5.0,
                z: -2.0,
            },
        ]);
        model.seed(0.0).unwrap();
        let summary = model.run().unwrap();
        assert_eq!(summary.n_active, 2);
        // 40 步 × 0.5 s × 1 m/s = 20 m
        assert!((model.particles()[0].coords.x - 20.0).abs() < 1e-8);
    }

    #[test]
    fn test_cancellation_between_steps() {
        let mut model = Model::new(base_config(1.0, 1000), uniform_source()).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: -1.0,
        }]);
        model.seed(0.0).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        model.set_cancel_flag(flag);
        // 立即取消：位置不变
        model.run().unwrap();
        assert!(model.particles()[0].coords.x.abs() < 1e-12);
    }

    #[test]
    fn test_surface_only_pins_to_surface() {
        let mut config = base_config(1.0, 10);
        config.simulation.surface_only = true;
        let source = Box::new(
            AnalyticFieldSource::new(Arc::new(|_t, _x, _y, _z| DVec3::new(0.0, 0.0, -0.5)))
                .with_vertical_range(-10.0, 0.0),
        );
        let mut model = Model::new(config, source).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: -3.0,
        }]);
        model.seed(0.0).unwrap();
        model.step(0.0).unwrap();
        assert!((model.particles()[0].coords.z - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_depth_restoring() {
        let mut config = base_config(1.0, 10);
        config.simulation.depth_restoring = true;
        config.simulation.fixed_depth = Some(-4.0);
        let mut model = Model::new(config, uniform_source()).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: -1.0,
        }]);
        model.seed(0.0).unwrap();
        model.step(0.0).unwrap();
        // ζ = 0（解析采样器返回 zmax=0）→ z = -4
        assert!((model.particles()[0].coords.z + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_reseed_restores_initial_state() {
        let mut model = Model::new(base_config(1.0, 10), uniform_source()).unwrap();
        model.set_particle_data(vec![ParticleSeed {
            group_id: 1,
            x: 0.0,
            y: 0.0,
            z: -5.0,
        }]);
        model.seed(0.0).unwrap();
        model.step(0.0).unwrap();
        assert!(model.particles()[0].coords.x > 0.5);
        model.reseed(0.0).unwrap();
        assert!(model.particles()[0].coords.x.abs() < 1e-12);
    }
}
