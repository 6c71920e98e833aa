// crates/ml_track/tests/determinism.rs

//! 可复现性验证
//!
//! 粒子随机流由 `(模拟种子, 粒子 id)` 派生且与并行调度无关：
//! 相同种子复播必须给出逐位一致的轨迹；不同种子的轨迹应当
//! 不同。`reseed` 后复跑等价于全新运行。

use std::sync::Arc;

use chrono::NaiveDate;
use ml_config::*;
use ml_field::{ColumnFieldSource, DiffusivityProfile};
use ml_track::{Model, ParticleSeed};

fn config(n_steps: i64) -> ModelConfig {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    ModelConfig {
        simulation: SimulationConfig {
            time_step: 1.0,
            start_datetime: start,
            end_datetime: start + chrono::Duration::seconds(n_steps),
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
            num_method: NumMethodKind::Standard,
            n_inner_steps: 1,
            adv_iterative_method: AdvectionScheme::None,
            diff_iterative_method: DiffusionScheme::Visser,
        },
        boundary_conditions: BoundaryConditionsConfig {
            horiz_bound_cond: HorizBoundaryKind::None,
            vert_bound_cond: VertBoundaryKind::Reflecting,
        },
        general: GeneralConfig::default(),
    }
}

fn make_model(sim_seed: u64) -> Model {
    let source = Box::new(ColumnFieldSource::new(
        40.0,
        DiffusivityProfile::Analytic(Arc::new(|d| 1e-3 + 1e-4 * d)),
    ));
    let mut model = Model::new(config(50), source).unwrap().with_seed(sim_seed);
    let seeds: Vec<ParticleSeed> = (0..20)
        .map(|i| ParticleSeed {
            group_id: 0,
            x: 0.0,
            y: 0.0,
            z: -2.0 * (i as f64 + 0.5),
        })
        .collect();
    model.set_particle_data(seeds);
    model
}

fn final_positions(model: &Model) -> Vec<u64> {
    model
        .particles()
        .iter()
        .map(|p| p.coords.z.to_bits())
        .collect()
}

#[test]
fn same_seed_bitwise_identical() {
    let run = |seed: u64| {
        let mut model = make_model(seed);
        model.seed(0.0).unwrap();
        model.run().unwrap();
        final_positions(&model)
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn different_seeds_diverge() {
    let run = |seed: u64| {
        let mut model = make_model(seed);
        model.seed(0.0).unwrap();
        model.run().unwrap();
        final_positions(&model)
    };
    assert_ne!(run(42), run(43));
}

#[test]
fn reseed_replays_identically() {
    let mut model = make_model(7);
    model.seed(0.0).unwrap();
    model.run().unwrap();
    let first = final_positions(&model);

    // 集合复播：保留的种子向量 + 同一模拟种子
    model.reseed(0.0).unwrap();
    model.run().unwrap();
    let second = final_positions(&model);

    assert_eq!(first, second);
}
