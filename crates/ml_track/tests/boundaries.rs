// crates/ml_track/tests/boundaries.rs

//! 边界条件端到端验证
//!
//! - 陆地边界法向入射反射的对称性（越界 δ → 界内 δ）
//! - 开边界穿越一步内离域并退出诊断
//! - 底部吸收终态
//! - 复位边界退回步前位置

use std::sync::Arc;

use chrono::NaiveDate;
use ml_config::*;
use ml_field::{
    ColumnFieldSource, DiffusivityProfile, FieldFrame, InMemorySnapshots, UnstructuredFieldSource,
};
use ml_mesh::generation::{rectangle, RectangleMeshConfig, Side};
use ml_mesh::TriMesh;
use ml_track::{Model, ParticleSeed, ParticleStatus};

fn config(
    dt: f64,
    n_seconds: i64,
    depth_coordinates: DepthCoordinates,
    horiz: HorizBoundaryKind,
    vert: VertBoundaryKind,
) -> ModelConfig {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    ModelConfig {
        simulation: SimulationConfig {
            time_step: dt,
            start_datetime: start,
            end_datetime: start + chrono::Duration::seconds(n_seconds),
            depth_coordinates,
            coordinate_system: CoordinateSystem::Cartesian,
            surface_only: false,
            depth_restoring: false,
            fixed_depth: None,
            height_restoring: false,
            fixed_height: None,
            allow_beaching: false,
        },
        numerics: NumericsConfig {
            num_method: NumMethodKind::Standard,
            n_inner_steps: 1,
            adv_iterative_method: AdvectionScheme::Euler,
            diff_iterative_method: DiffusionScheme::None,
        },
        boundary_conditions: BoundaryConditionsConfig {
            horiz_bound_cond: horiz,
            vert_bound_cond: vert,
        },
        general: GeneralConfig::default(),
    }
}

/// 全陆地边界的方形域 + 均匀流场
fn uniform_flow_source(open_east: bool, u: f64, v: f64) -> Box<UnstructuredFieldSource> {
    let mesh = Arc::new(
        rectangle(&RectangleMeshConfig {
            nx: 4,
            ny: 4,
            dx: 1.0,
            dy: 1.0,
            depth: 10.0,
            n_siglay: 4,
            open_sides: if open_east {
                vec![Side::East]
            } else {
                Vec::new()
            },
            ..Default::default()
        })
        .unwrap(),
    );
    let build = |mesh: &TriMesh, t: f64| {
        let mut f = FieldFrame::zeros(mesh, t);
        f.u.fill(u);
        f.v.fill(v);
        f
    };
    let provider = Box::new(InMemorySnapshots::new(vec![
        build(&mesh, 0.0),
        build(&mesh, 1.0e6),
    ]));
    Box::new(UnstructuredFieldSource::new(mesh, provider, 0.0).unwrap())
}

#[test]
fn land_reflection_is_symmetric() {
    // 以 0.5 m/s 法向入射西侧陆地边界，Δt = 0.3 → 越界 δ = 0.05
    let source = uniform_flow_source(false, -0.5, 0.0);
    let mut model = Model::new(
        config(
            0.3,
            1,
            DepthCoordinates::Sigma,
            HorizBoundaryKind::Reflecting,
            VertBoundaryKind::Reflecting,
        ),
        source,
    )
    .unwrap();
    model.set_particle_data(vec![ParticleSeed {
        group_id: 0,
        x: 0.1,
        y: 2.05,
        z: -0.5,
    }]);
    model.seed(0.0).unwrap();
    model.step(0.0).unwrap();

    let p = &model.particles()[0];
    assert_eq!(p.status, ParticleStatus::Active);
    assert!(
        (p.coords.x - 0.05).abs() < 1e-10,
        "反射不对称: x = {}",
        p.coords.x
    );
    assert!((p.coords.y - 2.05).abs() < 1e-10);
}

#[test]
fn restoring_returns_to_previous_position() {
    let source = uniform_flow_source(false, -0.5, 0.0);
    let mut model = Model::new(
        config(
            0.3,
            1,
            DepthCoordinates::Sigma,
            HorizBoundaryKind::Restoring,
            VertBoundaryKind::Reflecting,
        ),
        source,
    )
    .unwrap();
    model.set_particle_data(vec![ParticleSeed {
        group_id: 0,
        x: 0.1,
        y: 2.05,
        z: -0.5,
    }]);
    model.seed(0.0).unwrap();
    let host_before = model.particles()[0].coords.host;
    model.step(0.0).unwrap();

    let p = &model.particles()[0];
    assert_eq!(p.status, ParticleStatus::Active);
    assert!((p.coords.x - 0.1).abs() < 1e-12);
    assert_eq!(p.coords.host, host_before);
}

#[test]
fn open_boundary_exit_in_one_step() {
    // 东侧开边界，向东 0.5 m/s，一步越界
    let source = uniform_flow_source(true, 0.5, 0.0);
    let mut model = Model::new(
        config(
            0.5,
            2,
            DepthCoordinates::Sigma,
            HorizBoundaryKind::Reflecting,
            VertBoundaryKind::Reflecting,
        ),
        source,
    )
    .unwrap();
    model.set_particle_data(vec![
        ParticleSeed {
            group_id: 0,
            x: 3.9,
            y: 2.05,
            z: -0.5,
        },
        ParticleSeed {
            group_id: 0,
            x: 1.0,
            y: 1.05,
            z: -0.5,
        },
    ]);
    model.seed(0.0).unwrap();
    let summary = model.step(0.0).unwrap();

    assert_eq!(summary.n_out_of_domain, 1);
    assert_eq!(summary.n_active, 1);
    assert_eq!(model.particles()[0].status, ParticleStatus::OutOfDomain);

    // 离域粒子退出诊断
    let diag = model.get_diagnostics(0.5);
    assert_eq!(diag.len(), 1);
    assert_eq!(diag[0].id, 1);

    // 后续步中保持终态、不再移动
    let x_frozen = model.particles()[0].coords.x;
    model.step(0.5).unwrap();
    assert_eq!(model.particles()[0].status, ParticleStatus::OutOfDomain);
    assert_eq!(model.particles()[0].coords.x, x_frozen);
}

#[test]
fn absorbing_bottom_is_terminal() {
    // 水柱中以 0.05 m/s 下沉，底部吸收
    let source = Box::new(
        ColumnFieldSource::new(40.0, DiffusivityProfile::Constant(0.0))
            .with_vertical_velocity(-0.05),
    );
    let mut model = Model::new(
        config(
            10.0,
            100,
            DepthCoordinates::Cartesian,
            HorizBoundaryKind::None,
            VertBoundaryKind::AbsorbingBottom,
        ),
        source,
    )
    .unwrap();
    model.set_particle_data(vec![ParticleSeed {
        group_id: 0,
        x: 0.0,
        y: 0.0,
        z: -39.9,
    }]);
    model.seed(0.0).unwrap();

    // 第一步: z 试探 = -40.4 < zmin → 吸收
    let summary = model.step(0.0).unwrap();
    assert_eq!(summary.n_absorbed, 1);
    let p = &model.particles()[0];
    assert_eq!(p.status, ParticleStatus::Absorbed);
    let z_rest = p.coords.z;
    assert!((z_rest + 40.0).abs() < 1e-12);

    // 终态不再移动
    model.step(10.0).unwrap();
    assert_eq!(model.particles()[0].coords.z, z_rest);
    assert_eq!(model.particles()[0].status, ParticleStatus::Absorbed);
}

#[test]
fn surface_stays_reflecting_with_absorbing_bottom() {
    let source = Box::new(
        ColumnFieldSource::new(40.0, DiffusivityProfile::Constant(0.0))
            .with_vertical_velocity(0.05),
    );
    let mut model = Model::new(
        config(
            10.0,
            10,
            DepthCoordinates::Cartesian,
            HorizBoundaryKind::None,
            VertBoundaryKind::AbsorbingBottom,
        ),
        source,
    )
    .unwrap();
    model.set_particle_data(vec![ParticleSeed {
        group_id: 0,
        x: 0.0,
        y: 0.0,
        z: -0.2,
    }]);
    model.seed(0.0).unwrap();
    model.step(0.0).unwrap();

    let p = &model.particles()[0];
    // z 试探 = 0.3 → 表面反射 → -0.3
    assert_eq!(p.status, ParticleStatus::Active);
    assert!((p.coords.z + 0.3).abs() < 1e-12);
}

#[test]
fn active_particles_stay_in_bounds() {
    // 多步反射运行后：活跃粒子的 z 始终在 [zmin, zmax]，宿主有效
    let source = uniform_flow_source(false, -0.3, 0.2);
    let mut model = Model::new(
        config(
            1.0,
            60,
            DepthCoordinates::Sigma,
            HorizBoundaryKind::Reflecting,
            VertBoundaryKind::Reflecting,
        ),
        source,
    )
    .unwrap();
    let seeds: Vec<ParticleSeed> = (0..20)
        .map(|i| ParticleSeed {
            group_id: 0,
            x: 0.3 + 0.17 * i as f64 % 3.4,
            y: 0.3 + 0.23 * i as f64 % 3.4,
            z: -0.05 * (i as f64 + 1.0),
        })
        .collect();
    model.set_particle_data(seeds);
    model.seed(0.0).unwrap();
    model.run().unwrap();

    for p in model.particles() {
        if p.status.is_active() {
            assert!((-1.0..=0.0).contains(&p.coords.z));
            assert!(p.coords.host < 32);
            let min_phi = p.coords.phi.iter().cloned().fold(f64::INFINITY, f64::min);
            assert!(min_phi >= -1e-10, "φ_min = {}", min_phi);
        }
    }
}
