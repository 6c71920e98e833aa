// crates/ml_track/src/geo.rs

//! 水平坐标变换
//!
//! 平面直角网格上位移即米；地理（经纬度）网格上，米制位移与
//! 边界反射都在局部切平面上进行，再换算回度。切平面取等矩
//! 投影（小位移下误差 O(Δ²/R²)，对单步位移足够）。

use glam::DVec2;
use ml_config::CoordinateSystem;

/// 地球平均半径 [m]
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 水平坐标变换
///
/// 启动期从配置确定一次，粒子更新阶段按值复制到各工作线程。
#[derive(Debug, Clone, Copy)]
pub struct CoordinateTransform {
    system: CoordinateSystem,
}

impl CoordinateTransform {
    /// 从坐标系配置创建
    pub fn new(system: CoordinateSystem) -> Self {
        Self { system }
    }

    /// 坐标系
    #[inline]
    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    /// 米制位移换算到网格坐标增量
    ///
    /// `at` 为位移起点（地理网格下 y 为纬度，用于经度缩放）。
    pub fn metres_to_grid(&self, d_metres: DVec2, at: DVec2) -> DVec2 {
        match self.system {
            CoordinateSystem::Cartesian => d_metres,
            CoordinateSystem::Geographic => {
                let lat = at.y.to_radians();
                let dlon = (d_metres.x / (EARTH_RADIUS_M * lat.cos())).to_degrees();
                let dlat = (d_metres.y / EARTH_RADIUS_M).to_degrees();
                DVec2::new(dlon, dlat)
            }
        }
    }

    /// 网格点投影到以 origin 为原点的局部切平面 [m]
    pub fn to_tangent(&self, origin: DVec2, p: DVec2) -> DVec2 {
        match self.system {
            CoordinateSystem::Cartesian => p - origin,
            CoordinateSystem::Geographic => {
                let lat0 = origin.y.to_radians();
                DVec2::new(
                    (p.x - origin.x).to_radians() * EARTH_RADIUS_M * lat0.cos(),
                    (p.y - origin.y).to_radians() * EARTH_RADIUS_M,
                )
            }
        }
    }

    /// 局部切平面点换算回网格坐标
    pub fn from_tangent(&self, origin: DVec2, p_metres: DVec2) -> DVec2 {
        match self.system {
            CoordinateSystem::Cartesian => origin + p_metres,
            CoordinateSystem::Geographic => {
                let lat0 = origin.y.to_radians();
                DVec2::new(
                    origin.x + (p_metres.x / (EARTH_RADIUS_M * lat0.cos())).to_degrees(),
                    origin.y + (p_metres.y / EARTH_RADIUS_M).to_degrees(),
                )
            }
        }
    }
}
