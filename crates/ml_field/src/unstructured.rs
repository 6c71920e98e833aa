// crates/ml_field/src/unstructured.rs

//! 非结构网格采样器（FVCOM 风格交错布置）
//!
//! 水平方向：`u, v` 为单元中心量，优先使用预计算的 LLS 系数
//! 重建线性分布；系数缺失时回退 Shepard 反距离加权；含边界边
//! 的单元一律旁路取中心值。节点量（ζ, ω, k_h, A_h）用重心坐标
//! 线性插值。
//!
//! 垂向方向：层中心量用层括号线性混合，界面量用界面括号；
//! 括号由 `set_local_coordinates` 缓存。
//!
//! σ 单位换算：垂向 σ 速度输出时乘 `(h+ζ)` 转为 m/s；垂向
//! 扩散系数除 `(h+ζ)²` 转入 σ 坐标，随机游走直接在 σ 空间
//! 进行。

use std::sync::Arc;

use glam::{DVec2, DVec3};

use ml_foundation::TrackingTolerance;
use ml_mesh::{HostLocator, HostQuery, TriMesh};

use crate::coords::SpatialCoords;
use crate::error::FieldError;
use crate::frames::{FrameBuffer, SnapshotProvider};
use crate::kernels::{
    blend_bracket, interp_in_triangle, linear_blend, lls_interp, locate_layer_bracket,
    locate_level_bracket, nodal_gradient, shepard_interp, time_fraction,
};
use crate::sampler::FieldSampler;

/// 水平速度分量选择
#[derive(Clone, Copy)]
enum UV {
    U,
    V,
}

/// 非结构网格采样器
pub struct UnstructuredFieldSource {
    mesh: Arc<TriMesh>,
    provider: Box<dyn SnapshotProvider>,
    frames: FrameBuffer,
    tolerance: TrackingTolerance,
    /// 严格模式：插值分数越界直接报错（full_logging）
    strict: bool,
}

impl UnstructuredFieldSource {
    /// 创建采样器并在 t0 初始化时间框架
    pub fn new(
        mesh: Arc<TriMesh>,
        provider: Box<dyn SnapshotProvider>,
        t0: f64,
    ) -> Result<Self, FieldError> {
        let frames = FrameBuffer::initialise(provider.as_ref(), t0)?;
        if !frames.last().matches(&mesh) || !frames.next().matches(&mesh) {
            return Err(FieldError::Io(
                "场快照维度与网格规模不匹配".to_string(),
            ));
        }
        Ok(Self {
            mesh,
            provider,
            frames,
            tolerance: TrackingTolerance::default(),
            strict: false,
        })
    }

    /// 设置严格模式（插值分数越界报错而非钳位）
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// 设置容差
    pub fn with_tolerance(mut self, tolerance: TrackingTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// 网格引用
    #[inline]
    pub fn mesh_ref(&self) -> &TriMesh {
        &self.mesh
    }

    #[inline]
    fn locator(&self) -> HostLocator<'_> {
        HostLocator::with_tolerance(&self.mesh, self.tolerance)
    }

    #[inline]
    fn alpha(&self, t: f64) -> Result<f64, FieldError> {
        let (t_last, t_next) = self.frames.interval();
        time_fraction(t, t_last, t_next, self.strict)
    }

    /// 节点 × 界面量在粒子处的三角形插值（时间已混合）
    fn node_level_tri(
        &self,
        field: impl Fn(&crate::frames::FieldFrame) -> &ndarray::Array2<f64>,
        coords: &SpatialCoords,
        k: usize,
        alpha: f64,
    ) -> f64 {
        let nodes = self.mesh.element_nodes(coords.host);
        let last = field(self.frames.last());
        let next = field(self.frames.next());
        let mut values = [0.0; 3];
        for (i, &n) in nodes.iter().enumerate() {
            values[i] = linear_blend(last[(k, n)], next[(k, n)], alpha);
        }
        interp_in_triangle(&values, &coords.phi)
    }

    /// 单元中心量在 (层 k, 粒子水平位置) 的取值
    fn layer_uv(&self, which: UV, k: usize, coords: &SpatialCoords, alpha: f64) -> f64 {
        let e = coords.host;
        let pick = |frame: &crate::frames::FieldFrame, elem: usize| -> f64 {
            match which {
                UV::U => frame.u[(k, elem)],
                UV::V => frame.v[(k, elem)],
            }
        };
        let centre = |elem: usize| -> f64 {
            linear_blend(
                pick(self.frames.last(), elem),
                pick(self.frames.next(), elem),
                alpha,
            )
        };

        // 边界单元旁路：直接取宿主中心值
        if self.mesh.is_boundary_element(e) {
            return centre(e);
        }

        let neighbors = [
            self.mesh.neighbor(e, 0) as usize,
            self.mesh.neighbor(e, 1) as usize,
            self.mesh.neighbor(e, 2) as usize,
        ];
        let values = [
            centre(e),
            centre(neighbors[0]),
            centre(neighbors[1]),
            centre(neighbors[2]),
        ];

        match (self.mesh.a1u(), self.mesh.a2u()) {
            (Some(a1u), Some(a2u)) => lls_interp(
                a1u,
                a2u,
                e,
                self.mesh.centroid(e),
                coords.x,
                coords.y,
                &values,
            ),
            _ => {
                let centroids = [
                    self.mesh.centroid(e),
                    self.mesh.centroid(neighbors[0]),
                    self.mesh.centroid(neighbors[1]),
                    self.mesh.centroid(neighbors[2]),
                ];
                shepard_interp(&centroids, &values, coords.x, coords.y)
            }
        }
    }

    /// 层中心量沿 σ 括号混合
    fn uv_at(&self, which: UV, coords: &SpatialCoords, alpha: f64) -> f64 {
        if coords.in_vertical_boundary_layer || coords.k_upper_layer == coords.k_lower_layer {
            self.layer_uv(which, coords.k_upper_layer, coords, alpha)
        } else {
            let upper = self.layer_uv(which, coords.k_upper_layer, coords, alpha);
            let lower = self.layer_uv(which, coords.k_lower_layer, coords, alpha);
            blend_bracket(upper, lower, coords.beta_layer)
        }
    }

    /// 垂向扩散系数（σ 单位制），缓存括号按 coords 当前值
    fn kh_value(&self, t: f64, coords: &SpatialCoords) -> Result<f64, FieldError> {
        let alpha = self.alpha(t)?;
        let upper = self.node_level_tri(|f| &f.kh, coords, coords.k_level, alpha);
        let lower = self.node_level_tri(|f| &f.kh, coords, coords.k_level + 1, alpha);
        let raw = blend_bracket(upper, lower, coords.beta_level);
        let depth = self.total_water_depth(t, coords)?;
        Ok(raw / (depth * depth))
    }

    /// 全水深 `h + ζ`
    fn total_water_depth(&self, t: f64, coords: &SpatialCoords) -> Result<f64, FieldError> {
        let h = self.mesh.bathymetry_at(coords.host, &coords.phi);
        let zeta = self.get_sea_surface_elevation(t, coords);
        let depth = h + zeta;
        if depth < self.tolerance.min_denominator {
            return Err(FieldError::NonFinite {
                what: "total water depth",
            });
        }
        Ok(depth)
    }

    /// A_h 的三个顶点值（时间与 σ 已混合）
    fn ah_vertex_values(&self, coords: &SpatialCoords, alpha: f64) -> [f64; 3] {
        let nodes = self.mesh.element_nodes(coords.host);
        let last = &self.frames.last().ah;
        let next = &self.frames.next().ah;
        let mut values = [0.0; 3];
        for (i, &n) in nodes.iter().enumerate() {
            let upper = linear_blend(
                last[(coords.k_upper_layer, n)],
                next[(coords.k_upper_layer, n)],
                alpha,
            );
            let v = if coords.in_vertical_boundary_layer
                || coords.k_upper_layer == coords.k_lower_layer
            {
                upper
            } else {
                let lower = linear_blend(
                    last[(coords.k_lower_layer, n)],
                    next[(coords.k_lower_layer, n)],
                    alpha,
                );
                blend_bracket(upper, lower, coords.beta_layer)
            };
            values[i] = v;
        }
        values
    }
}

impl FieldSampler for UnstructuredFieldSource {
    fn read_data(&mut self, t: f64) -> Result<(), FieldError> {
        self.frames.read_data(self.provider.as_ref(), t)
    }

    fn find_host(&self, start_host: usize, x: f64, y: f64) -> HostQuery {
        self.locator().find_host_local(start_host, x, y)
    }

    fn find_host_global(&self, x: f64, y: f64) -> HostQuery {
        self.locator().find_host_global(x, y)
    }

    fn set_local_coordinates(&self, coords: &mut SpatialCoords) -> HostQuery {
        let query = if coords.has_host() {
            self.locator().find_host_local(coords.host, coords.x, coords.y)
        } else {
            self.locator().find_host_global(coords.x, coords.y)
        };
        if let HostQuery::Found { elem, phi } = query {
            coords.host = elem;
            coords.phi = phi;
            self.set_vertical_coordinates(coords);
        }
        query
    }

    fn set_vertical_coordinates(&self, coords: &mut SpatialCoords) {
        let host = coords.host;
        let phi = coords.phi;
        let (k, beta) = locate_level_bracket(
            |k| self.mesh.siglev_at(host, &phi, k),
            self.mesh.n_siglev(),
            coords.z,
        );
        coords.k_level = k;
        coords.beta_level = beta;

        let bracket = locate_layer_bracket(
            |k| self.mesh.siglay_at(host, &phi, k),
            self.mesh.n_siglay(),
            coords.z,
        );
        coords.k_upper_layer = bracket.k_upper;
        coords.k_lower_layer = bracket.k_lower;
        coords.beta_layer = bracket.beta;
        coords.in_vertical_boundary_layer = bracket.in_boundary;
    }

    fn get_velocity(&self, t: f64, coords: &SpatialCoords) -> Result<DVec3, FieldError> {
        if !coords.has_host() {
            return Err(FieldError::NoHost);
        }
        let alpha = self.alpha(t)?;

        let u = self.uv_at(UV::U, coords, alpha);
        let v = self.uv_at(UV::V, coords, alpha);

        // ω: 节点 × 界面，σ 速度 × (h+ζ) → m/s
        let om_upper = self.node_level_tri(|f| &f.omega, coords, coords.k_level, alpha);
        let om_lower = self.node_level_tri(|f| &f.omega, coords, coords.k_level + 1, alpha);
        let om = blend_bracket(om_upper, om_lower, coords.beta_level);
        let w = om * self.total_water_depth(t, coords)?;

        let vel = DVec3::new(u, v, w);
        if !vel.is_finite() {
            return Err(FieldError::NonFinite { what: "velocity" });
        }
        Ok(vel)
    }

    fn get_vertical_eddy_diffusivity(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        if !coords.has_host() {
            return Err(FieldError::NoHost);
        }
        let kh = self.kh_value(t, coords)?;
        if !kh.is_finite() {
            return Err(FieldError::NonFinite {
                what: "vertical eddy diffusivity",
            });
        }
        Ok(kh)
    }

    fn get_vertical_eddy_diffusivity_derivative(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        if !coords.has_host() {
            return Err(FieldError::NoHost);
        }
        let dz = self.tolerance.sigma_probe;
        let (zmin, zmax) = (-1.0, 0.0);

        // 探测点内翻，保持在域内
        let mut z_hi = coords.z + dz;
        let mut z_lo = coords.z - dz;
        if z_hi > zmax {
            z_hi = coords.z;
        }
        if z_lo < zmin {
            z_lo = coords.z;
        }

        let mut probe = *coords;
        probe.z = z_hi;
        self.set_vertical_coordinates(&mut probe);
        let k_hi = self.kh_value(t, &probe)?;

        probe.z = z_lo;
        self.set_vertical_coordinates(&mut probe);
        let k_lo = self.kh_value(t, &probe)?;

        Ok((k_hi - k_lo) / (z_hi - z_lo))
    }

    fn get_horizontal_eddy_viscosity(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<f64, FieldError> {
        if !coords.has_host() {
            return Err(FieldError::NoHost);
        }
        let alpha = self.alpha(t)?;
        let values = self.ah_vertex_values(coords, alpha);
        let ah = interp_in_triangle(&values, &coords.phi);
        if !ah.is_finite() {
            return Err(FieldError::NonFinite {
                what: "horizontal eddy viscosity",
            });
        }
        Ok(ah)
    }

    fn get_horizontal_eddy_viscosity_gradient(
        &self,
        t: f64,
        coords: &SpatialCoords,
    ) -> Result<DVec2, FieldError> {
        if !coords.has_host() {
            return Err(FieldError::NoHost);
        }
        let alpha = self.alpha(t)?;
        let values = self.ah_vertex_values(coords, alpha);
        Ok(nodal_gradient(&self.mesh, coords.host, &values))
    }

    fn get_zmin(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        -1.0
    }

    fn get_zmax(&self, _t: f64, _coords: &SpatialCoords) -> f64 {
        0.0
    }

    fn get_bathymetry(&self, coords: &SpatialCoords) -> f64 {
        self.mesh.bathymetry_at(coords.host, &coords.phi)
    }

    fn get_sea_surface_elevation(&self, t: f64, coords: &SpatialCoords) -> f64 {
        let alpha = self.alpha(t).unwrap_or(0.0);
        let nodes = self.mesh.element_nodes(coords.host);
        let last = &self.frames.last().zeta;
        let next = &self.frames.next().zeta;
        let mut values = [0.0; 3];
        for (i, &n) in nodes.iter().enumerate() {
            values[i] = linear_blend(last[n], next[n], alpha);
        }
        interp_in_triangle(&values, &coords.phi)
    }

    fn is_wet(&self, _t: f64, elem: usize) -> bool {
        self.frames.last().wet[elem] && self.frames.next().wet[elem]
    }

    fn mesh(&self) -> Option<&TriMesh> {
        Some(&self.mesh)
    }
}
