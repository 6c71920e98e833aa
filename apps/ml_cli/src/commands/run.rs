// apps/ml_cli/src/commands/run.rs

//! 运行内置演示场景
//!
//! 方形海盆中的刚体旋转环流：`u = -Ω·(y - y_c)`，`v = Ω·(x - x_c)`。
//! 粒子在盆地中部播种，RK4 对流 + Visser 扩散，四周陆地反射。
//! 用于零配置地验证整个追踪链路。

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use ml_config::*;
use ml_field::{FieldFrame, InMemorySnapshots, UnstructuredFieldSource};
use ml_mesh::generation::{rectangle, RectangleMeshConfig};
use ml_track::{Model, ParticleSeed};

/// 运行演示参数
#[derive(Args)]
pub struct RunArgs {
    /// 网格每边四边形数
    #[arg(long, default_value = "20")]
    pub nx: usize,

    /// 网格间距 [m]
    #[arg(long, default_value = "50.0")]
    pub dx: f64,

    /// 模拟时长 [s]
    #[arg(short = 't', long, default_value = "3600.0")]
    pub duration: f64,

    /// 时间步长 [s]
    #[arg(long, default_value = "10.0")]
    pub dt: f64,

    /// 粒子数
    #[arg(short = 'n', long, default_value = "500")]
    pub n_particles: usize,

    /// 环流角速度 [1/s]
    #[arg(long, default_value = "1e-3")]
    pub omega: f64,

    /// 随机流种子
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// 执行演示场景
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== MariLag 演示场景: 刚体旋转环流 ===");

    // 网格：四周陆地的方形海盆
    let mesh = Arc::new(
        rectangle(&RectangleMeshConfig {
            nx: args.nx,
            ny: args.nx,
            dx: args.dx,
            dy: args.dx,
            depth: 20.0,
            n_siglay: 10,
            open_sides: Vec::new(),
            ..Default::default()
        })
        .context("网格生成失败")?,
    );
    let side = args.nx as f64 * args.dx;
    let centre = 0.5 * side;
    info!(
        n_elems = mesh.n_elems(),
        n_nodes = mesh.n_nodes(),
        "网格生成完成"
    );

    // 定常环流快照（首尾两帧覆盖整个模拟窗口）
    let build_frame = |t: f64| {
        let mut frame = FieldFrame::zeros(&mesh, t);
        for e in 0..mesh.n_elems() {
            let c = mesh.centroid(e);
            for k in 0..mesh.n_siglay() {
                frame.u[(k, e)] = -args.omega * (c.y - centre);
                frame.v[(k, e)] = args.omega * (c.x - centre);
            }
        }
        frame.kh.fill(1e-3);
        frame.ah.fill(0.1);
        frame
    };
    let provider = Box::new(InMemorySnapshots::new(vec![
        build_frame(0.0),
        build_frame(args.duration + args.dt),
    ]));
    let source =
        Box::new(UnstructuredFieldSource::new(mesh, provider, 0.0).context("采样器初始化失败")?);

    // 配置记录（核心按值接收）
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let config = ModelConfig {
        simulation: SimulationConfig {
            time_step: args.dt,
            start_datetime: start,
            end_datetime: start + chrono::Duration::seconds(args.duration as i64),
            depth_coordinates: DepthCoordinates::Sigma,
            coordinate_system: CoordinateSystem::Cartesian,
            surface_only: false,
            depth_restoring: false,
            fixed_depth: None,
            height_restoring: false,
            fixed_height: None,
            allow_beaching: false,
        },
        numerics: NumericsConfig::default(),
        boundary_conditions: BoundaryConditionsConfig::default(),
        general: GeneralConfig::default(),
    };

    let mut model = Model::new(config, source)
        .context("驱动器创建失败")?
        .with_seed(args.seed);

    // 盆地中部方形区域播种
    let n_side = (args.n_particles as f64).sqrt().ceil() as usize;
    let spawn = side * 0.25;
    let seeds: Vec<ParticleSeed> = (0..args.n_particles)
        .map(|i| {
            let ix = i % n_side;
            let iy = i / n_side;
            ParticleSeed {
                group_id: 1,
                x: centre - 0.5 * spawn + spawn * ix as f64 / n_side.max(1) as f64,
                y: centre - 0.5 * spawn + spawn * iy as f64 / n_side.max(1) as f64,
                z: -0.5,
            }
        })
        .collect();
    model.set_particle_data(seeds);
    model.seed(0.0).context("播种失败")?;

    let summary = model.run().context("模拟失败")?;

    info!(
        n_active = summary.n_active,
        n_out = summary.n_out_of_domain,
        n_beached = summary.n_beached,
        n_absorbed = summary.n_absorbed,
        "=== 模拟结束 ==="
    );

    // 抽样打印几条诊断
    let diag = model.get_diagnostics(args.duration - args.dt);
    for d in diag.iter().take(5) {
        info!(
            id = d.id,
            x1 = d.x1,
            x2 = d.x2,
            x3 = d.x3,
            host = d.host,
            "粒子诊断"
        );
    }
    Ok(())
}
