// crates/ml_field/src/column.rs

//! 一维水柱采样器（GOTM 风格）
//!
//! 无水平网格的单点水柱：水平速度为零，垂向涡扩散系数来自
//! 解析廓线或查表。垂向坐标为笛卡尔（米），`z ∈ [-h, ζ]`，
//! 扩散系数与导数不做 σ 换算。
//!
//! 主要用于垂向随机游走的物理验证（良混合条件）与底部吸收
//! 边界测试。

use std::sync::Arc;

use glam::{DVec2, DVec3};

use ml_mesh::HostQuery;

use crate::coords::SpatialCoords;
use crate::error::FieldError;
use crate::sampler::FieldSampler;

/// 扩散系数廓线
///
/// 闭包以水面下深度 `d = ζ - z ≥ 0` 为自变量，返回 k [m²/s]。
#[derive(Clone)]
pub enum DiffusivityProfile {
    /// 常数廓线
    Constant(f64),
    /// 解析廓线
    Analytic(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl DiffusivityProfile {
    /// 在水面下深度 d 处取值
    #[inline]
    pub fn value(&self, depth_below_surface: f64) -> f64 {
        match self {
            Self::Constant(k) => *k,
            Self::Analytic(f) => f(depth_below_surface),
        }
    }
}

impl std::fmt::Debug for DiffusivityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(k) => write!(f, "Constant({})", k),
            Self::Analytic(_) => write!(f, "Analytic(..)"),
        }
    }
}

/// 一维水柱采样器
#[derive(Debug, Clone)]
pub struct ColumnFieldSource {
    /// 水柱深度 h [m]（向下为正）
    depth: f64,
    /// 海面高度 ζ [m]（定常）
    zeta: f64,
    /// 扩散系数廓线
    profile: DiffusivityProfile,
    /// 垂向速度 [m/s]（定常，默认 0）
    w: f64,
    /// 导数差分增量 [m]
    probe_dz: f64,
}

impl ColumnFieldSource {
    /// 创建水柱采样器
    pub fn new(depth: f64, profile: DiffusivityProfile) -> Self {
        assert!(depth > 0.0, "水柱深度必须为正");
        Self {
            depth,
            zeta: 0.0,
            profile,
            w: 0.0,
            // 探测增量取水深的千分之一
            probe_dz: depth * 1e-3,
        }
    }

    /// 设置定常海面高度
    pub fn with_zeta(mut self, zeta: f64) -> Self {
        self.zeta = zeta;
        self
    }

    /// 设置定常垂向速度
    pub fn with_vertical_velocity(mut self, w: f64) -> Self {
        self.w = w;
        self
    }

    /// 廓线在坐标 z 处的取值
    #[inline]
    fn kh(&self, z: f64) -> f64 {
        self.profile.value(self.zeta - z)
    }
}

impl FieldSampler for ColumnFieldSource {
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

    fn get_velocity(&self, _t: f64, _coords: &SpatialCoords) -> Result<DVec3, FieldError> {
        Ok(DVec3::new(0.0, 0.0, self.w))
    }

    fn get_vertical_eddy_diffusivity(
        &self,
        _t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        let k = self.kh(coords.z);
        if !k.is_finite() {
            return Err(FieldError::NonFinite {
                what: "vertical eddy diffusivity",
            });
        }
        Ok(k)
    }

    fn get_vertical_eddy_diffusivity_derivative(
        &self,
        _t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        let dz = self.probe_dz;
        let (zmin, zmax) = (-self.depth, self.zeta);
        let mut z_hi = coords.z + dz;
        let mut z_lo = coords.z - dz;
        if z_hi > zmax {
            z_hi = coords.z;
        }
        if z_lo < zmin {
            z_lo = coords.z;
        }
        Ok((self.kh(z_hi) - self.kh(z_lo)) / (z_hi - z_lo))
    }

    fn get_horizontal_eddy_viscosity(
        &self,
        _t: f64,
        _coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        Ok(0.0)
    }

    fn get_horizontal_eddy_viscosity_gradient(
        &self,
        _t: f64,
        _coords: &SpatialCoords,
    ) -> Result<DVec2, FieldError> {
        Ok(DVec2::ZERO)
    }

    fn get_zmin(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        -self.depth
    }

    fn get_zmax(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        self.zeta
    }

    fn get_bathymetry(&self, _coords: &SpatialCoords) -> f64 {
        self.depth
    }

    fn get_sea_surface_elevation(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        self.zeta
    }

    fn is_wet(&self, _t: f64, _elem: usize) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_profile() {
        let source = ColumnFieldSource::new(40.0, DiffusivityProfile::Constant(1e-3));
        let c = SpatialCoords::new(0.0, 0.0, -20.0);
        assert!((source.get_vertical_eddy_diffusivity(0.0, &c).unwrap() - 1e-3).abs() < 1e-15);
        let dk = source
            .get_vertical_eddy_diffusivity_derivative(0.0, &c)
            .unwrap();
        assert!(dk.abs() < 1e-15);
    }

    #[test]
    fn test_analytic_profile_derivative() {
        // k(d) = 1e-3 · d，d 为水面下深度 → dk/dz = -1e-3
        let source = ColumnFieldSource::new(
            40.0,
            DiffusivityProfile::Analytic(Arc::new(|d| 1e-3 * d)),
        );
        let c = SpatialCoords::new(0.0, 0.0, -10.0);
        let dk = source
            .get_vertical_eddy_diffusivity_derivative(0.0, &c)
            .unwrap();
        assert!((dk + 1e-3).abs() < 1e-10, "dk = {}", dk);
    }

    #[test]
    fn test_vertical_range() {
        let source =
            ColumnFieldSource::new(40.0, DiffusivityProfile::Constant(1e-3)).with_zeta(0.5);
        let c = SpatialCoords::new(0.0, 0.0, -1.0);
        assert!((source.get_zmin(0.0, &c) + 40.0).abs() < 1e-12);
        assert!((source.get_zmax(0.0, &c) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_one_sided_at_surface() {
        let source = ColumnFieldSource::new(
            40.0,
            DiffusivityProfile::Analytic(Arc::new(|d| 1e-3 * d)),
        );
        // 紧贴水面，上探测点会越界 → 单侧差分仍应给出 -1e-3
        let c = SpatialCoords::new(0.0, 0.0, -0.001);
        let dk = source
            .get_vertical_eddy_diffusivity_derivative(0.0, &c)
            .unwrap();
        assert!((dk + 1e-3).abs() < 1e-10);
    }
}
