// crates/ml_field/src/analytic.rs

//! 解析采样器
//!
//! 速度与扩散由闭包给出，域无界（宿主恒为 0，永不越界）。
//! 用于数值方法的收敛性验证：给定解析速度场
//! `(u, v, w) = f(t, x, y, z)`，RK4 轨迹可与精确解直接比较。

use std::sync::Arc;

use glam::{DVec2, DVec3};

use ml_mesh::HostQuery;

use crate::coords::SpatialCoords;
use crate::error::FieldError;
use crate::sampler::FieldSampler;

/// 速度闭包类型
pub type VelocityFn = Arc<dyn Fn(f64, f64, f64, f64) -> DVec3 + Send + Sync>;

/// 解析采样器
#[derive(Clone)]
pub struct AnalyticFieldSource {
    velocity: VelocityFn,
    kh: f64,
    ah: f64,
    zmin: f64,
    zmax: f64,
}

impl AnalyticFieldSource {
    /// 以速度闭包创建，扩散为零，垂向范围无界
    pub fn new(velocity: VelocityFn) -> Self {
        Self {
            velocity,
            kh: 0.0,
            ah: 0.0,
            zmin: f64::NEG_INFINITY,
            zmax: f64::INFINITY,
        }
    }

    /// 设置常数垂向扩散系数
    pub fn with_vertical_diffusivity(mut self, kh: f64) -> Self {
        self.kh = kh;
        self
    }

    /// 设置常数水平涡粘性
    pub fn with_horizontal_viscosity(mut self, ah: f64) -> Self {
        self.ah = ah;
        self
    }

    /// 设置垂向范围
    pub fn with_vertical_range(mut self, zmin: f64, zmax: f64) -> Self {
        assert!(zmin < zmax, "zmin 必须小于 zmax");
        self.zmin = zmin;
        self.zmax = zmax;
        self
    }
}

impl FieldSampler for AnalyticFieldSource {
    fn read_data(&mut self, _t: f64) -> Result<(), FieldError> {
        Ok(())
    }

    fn find_host(&self, _start_host: usize, _x: f64, _y: f64) -> HostQuery {
        HostQuery::Found {
            elem: 0,
            phi: [1.0, 0.0, 0.0],
        }
    }

    fn find_host_global(&self, _x: f64, _y: f64) -> HostQuery {
        HostQuery::Found {
            elem: 0,
            phi: [1.0, 0.0, 0.0],
        }
    }

    fn set_local_coordinates(&self, coords: &mut SpatialCoords) -> HostQuery {
        coords.host = 0;
        coords.phi = [1.0, 0.0, 0.0];
        HostQuery::Found {
            elem: 0,
            phi: coords.phi,
        }
    }

    fn set_vertical_coordinates(&self, _coords: &mut SpatialCoords) {}

    fn get_velocity(&self, t: f64, coords: &SpatialCoords) -> Result<DVec3, FieldError> {
        let vel = (self.velocity)(t, coords.x, coords.y, coords.z);
        if !vel.is_finite() {
            return Err(FieldError::NonFinite { what: "velocity" });
        }
        Ok(vel)
    }

    fn get_vertical_eddy_diffusivity(
        &self,
        _t: f64,
        _coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        Ok(self.kh)
    }

    fn get_vertical_eddy_diffusivity_derivative(
        &self,
        _t: f64,
        _coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        Ok(0.0)
    }

    fn get_horizontal_eddy_viscosity(
        &self,
        _t: f64,
        _coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        Ok(self.ah)
    }

    fn get_horizontal_eddy_viscosity_gradient(
        &self,
        _t: f64,
        _coords: &SpatialCoords,
    ) -> Result<DVec2, FieldError> {
        Ok(DVec2::ZERO)
    }

    fn get_zmin(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        self.zmin
    }

    fn get_zmax(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        self.zmax
    }

    fn get_bathymetry(&self, _coords: &SpatialCoords) -> f64 {
        if self.zmin.is_finite() {
            -self.zmin
        } else {
            0.0
        }
    }

    fn get_sea_surface_elevation(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        if self.zmax.is_finite() {
            self.zmax
        } else {
            0.0
        }
    }

    fn is_wet(&self, _t: f64, _elem: usize) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_closure_evaluated_at_position() {
        let source = AnalyticFieldSource::new(Arc::new(|_t, x, y, _z| {
            DVec3::new(x, 1.5 * y, 0.0)
        }));
        let c = SpatialCoords::new(2.0, 4.0, 0.0);
        let vel = source.get_velocity(0.0, &c).unwrap();
        assert!((vel.x - 2.0).abs() < 1e-12);
        assert!((vel.y - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_velocity_reported() {
        let source =
            AnalyticFieldSource::new(Arc::new(|_t, _x, _y, _z| DVec3::new(f64::NAN, 0.0, 0.0)));
        let c = SpatialCoords::new(0.0, 0.0, 0.0);
        assert!(matches!(
            source.get_velocity(0.0, &c),
            Err(FieldError::NonFinite { .. })
        ));
    }
}
