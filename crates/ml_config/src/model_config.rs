// crates/ml_config/src/model_config.rs

//! 模拟配置记录
//!
//! 与配置文件的节结构一一对应：
//! - `[simulation]`: 时间步长、起止时刻、坐标约定、垂向约束
//! - `[numerics]`: 数值方法组合与迭代方法选择
//! - `[boundary_conditions]`: 水平/垂向边界条件
//! - `[general]`: 日志配置
//!
//! 所有枚举使用 snake_case 序列化，配置文件中的字符串
//! （如 `num_method = "operator_split_0"`）直接映射到变体。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================
// 枚举选项
// ============================================================

/// 垂向坐标约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthCoordinates {
    /// 笛卡尔坐标：z 为米，zmin=-h(x,y)，zmax=ζ(t,x,y)
    Cartesian,
    /// 地形跟随 σ 坐标：z∈[-1,0]
    #[default]
    Sigma,
}

/// 水平坐标系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    /// 平面直角坐标（米）
    #[default]
    Cartesian,
    /// 地理坐标（经纬度，边界反射在局部切平面上进行）
    Geographic,
}

/// 数值方法（迭代方法的组合方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumMethodKind {
    /// 单次调用：对流 + 扩散位移相加后统一提交
    #[default]
    Standard,
    /// 算子分裂 OS0：内层对流子步逐次提交，外层扩散一步
    OperatorSplit0,
}

/// 对流迭代方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvectionScheme {
    /// 四阶 Runge-Kutta
    #[default]
    Rk4,
    /// 一阶显式 Euler
    Euler,
    /// 不计算对流
    None,
}

/// 扩散迭代方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionScheme {
    /// Visser (1997) 良混合一致的垂向随机游走 + 二维水平随机游走
    #[default]
    Visser,
    /// 朴素随机游走（无漂移修正项，仅用于对照实验）
    Naive,
    /// 不计算扩散
    None,
}

/// 水平边界条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizBoundaryKind {
    /// 镜面反射
    #[default]
    Reflecting,
    /// 复位：退回上一位置
    Restoring,
    /// 不处理（越界粒子离域）
    None,
}

/// 垂向边界条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertBoundaryKind {
    /// 表底均反射
    #[default]
    Reflecting,
    /// 底部吸收（表面仍反射）
    AbsorbingBottom,
    /// 不处理
    None,
}

// ============================================================
// 配置节
// ============================================================

/// `[simulation]` 节
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 时间步长 [s]，必须为正
    pub time_step: f64,
    /// 模拟起始时刻
    pub start_datetime: NaiveDateTime,
    /// 模拟结束时刻
    pub end_datetime: NaiveDateTime,
    /// 垂向坐标约定
    #[serde(default)]
    pub depth_coordinates: DepthCoordinates,
    /// 水平坐标系
    #[serde(default)]
    pub coordinate_system: CoordinateSystem,
    /// 仅表层追踪：粒子钉在 zmax，跳过垂向运动
    #[serde(default)]
    pub surface_only: bool,
    /// 定深模式：每步后将粒子拉回水面下固定深度
    #[serde(default)]
    pub depth_restoring: bool,
    /// 定深深度 [m]，≤0（水面下为负）
    #[serde(default)]
    pub fixed_depth: Option<f64>,
    /// 定高模式：每步后将粒子拉回床面上固定高度，与定深互斥
    #[serde(default)]
    pub height_restoring: bool,
    /// 定高高度 [m]，≥0
    #[serde(default)]
    pub fixed_height: Option<f64>,
    /// 允许搁浅：干单元上的粒子转入 Beached 状态
    #[serde(default)]
    pub allow_beaching: bool,
}

/// `[numerics]` 节
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericsConfig {
    /// 数值方法组合方式
    #[serde(default)]
    pub num_method: NumMethodKind,
    /// 算子分裂内层对流子步数
    #[serde(default = "default_n_inner")]
    pub n_inner_steps: usize,
    /// 对流迭代方法
    #[serde(default)]
    pub adv_iterative_method: AdvectionScheme,
    /// 扩散迭代方法
    #[serde(default)]
    pub diff_iterative_method: DiffusionScheme,
}

fn default_n_inner() -> usize {
    1
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            num_method: NumMethodKind::Standard,
            n_inner_steps: 1,
            adv_iterative_method: AdvectionScheme::Rk4,
            diff_iterative_method: DiffusionScheme::Visser,
        }
    }
}

/// `[boundary_conditions]` 节
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundaryConditionsConfig {
    /// 水平边界条件
    #[serde(default)]
    pub horiz_bound_cond: HorizBoundaryKind,
    /// 垂向边界条件
    #[serde(default)]
    pub vert_bound_cond: VertBoundaryKind,
}

/// `[general]` 节
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 完整日志：插值分数越界等可恢复异常不再截断而是报错
    #[serde(default)]
    pub full_logging: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            full_logging: false,
        }
    }
}

// ============================================================
// 顶层配置
// ============================================================

/// 已解析的模拟配置记录
///
/// 由外层应用构造并校验后按值传入驱动器。核心不持有配置
/// 文件路径，也不做任何 IO。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 模拟节
    pub simulation: SimulationConfig,
    /// 数值方法节
    #[serde(default)]
    pub numerics: NumericsConfig,
    /// 边界条件节
    #[serde(default)]
    pub boundary_conditions: BoundaryConditionsConfig,
    /// 通用节
    #[serde(default)]
    pub general: GeneralConfig,
}

impl ModelConfig {
    /// 校验配置一致性
    ///
    /// 任何一项违反都返回 [`ConfigError`]（致命，启动期终止）。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;

        if !(sim.time_step > 0.0) || !sim.time_step.is_finite() {
            return Err(ConfigError::OutOfRange {
                key: "simulation.time_step",
                value: sim.time_step,
                requirement: "时间步长应为正的有限值",
            });
        }
        if sim.end_datetime <= sim.start_datetime {
            return Err(ConfigError::EmptyTimeWindow {
                start: sim.start_datetime,
                end: sim.end_datetime,
            });
        }
        if sim.depth_restoring && sim.height_restoring {
            return Err(ConfigError::MutuallyExclusive(
                "simulation.depth_restoring",
                "simulation.height_restoring",
            ));
        }
        if sim.depth_restoring {
            match sim.fixed_depth {
                None => return Err(ConfigError::Missing("simulation.fixed_depth")),
                Some(d) if d > 0.0 => {
                    return Err(ConfigError::OutOfRange {
                        key: "simulation.fixed_depth",
                        value: d,
                        requirement: "水面下深度应 ≤ 0",
                    });
                }
                _ => {}
            }
        }
        if sim.height_restoring {
            match sim.fixed_height {
                None => return Err(ConfigError::Missing("simulation.fixed_height")),
                Some(h) if h < 0.0 => {
                    return Err(ConfigError::OutOfRange {
                        key: "simulation.fixed_height",
                        value: h,
                        requirement: "床面上高度应 ≥ 0",
                    });
                }
                _ => {}
            }
        }

        let num = &self.numerics;
        if num.num_method == NumMethodKind::OperatorSplit0 && num.n_inner_steps == 0 {
            return Err(ConfigError::OutOfRange {
                key: "numerics.n_inner_steps",
                value: num.n_inner_steps as f64,
                requirement: "算子分裂的内层子步数应 ≥ 1",
            });
        }

        Ok(())
    }

    /// 模拟总时长 [s]
    pub fn duration_seconds(&self) -> f64 {
        let span = self.simulation.end_datetime - self.simulation.start_datetime;
        span.num_milliseconds() as f64 / 1000.0
    }

    /// 完整时间步数（向下取整）
    pub fn n_time_steps(&self) -> usize {
        (self.duration_seconds() / self.simulation.time_step).floor() as usize
    }
}
