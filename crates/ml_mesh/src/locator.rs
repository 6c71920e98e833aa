// crates/ml_mesh/src/locator.rs

//! 宿主单元定位
//!
//! 提供两种定位方式：
//!
//! - **局部行走** [`HostLocator::find_host_local`]：从上一宿主出发，
//!   沿重心坐标最小分量的对边逐单元行走。粒子单步位移通常只
//!   跨越少数单元，平均代价 O(1)。
//! - **全局扫描** [`HostLocator::find_host_global`]：O(N_elems) 逐一
//!   判断。用于播种引导与行走失败后的恢复。
//!
//! # 边界语义
//!
//! 行走越过 `nbe = -1`（陆地）或 `-2`（开边界）时分别报告
//! [`HostQuery::LandCross`] / [`HostQuery::OpenCross`]，由上层边界
//! 条件处理；这不是错误而是状态码。
//!
//! # 病态单元
//!
//! 几何判定命中但含有 ≥2 条陆地边的单元按陆地穿越处理，避免
//! 粒子被狭长的岸线单元困住。陆地边数每次从 `nbe` 现算。

use ml_foundation::TrackingTolerance;

use crate::topology::{TriMesh, LAND, OPEN};

/// 行走限制
#[derive(Debug, Clone, Copy)]
pub struct WalkLimits {
    /// 最大行走步数，超出报告 `SearchFailed`
    pub max_steps: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self { max_steps: 1000 }
    }
}

/// 宿主定位结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostQuery {
    /// 点在单元内
    Found {
        /// 宿主单元
        elem: usize,
        /// 重心坐标
        phi: [f64; 3],
    },
    /// 行走越过陆地边界
    LandCross {
        /// 最后一个域内单元
        elem: usize,
        /// 被越过的边（对顶点编号）
        edge: usize,
    },
    /// 行走越过开边界
    OpenCross {
        /// 最后一个域内单元
        elem: usize,
        /// 被越过的边
        edge: usize,
    },
    /// 行走未收敛（回到起点或超出步数限制）
    SearchFailed,
}

impl HostQuery {
    /// 是否定位成功
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// 宿主单元索引（仅 Found）
    #[inline]
    pub fn elem(&self) -> Option<usize> {
        match self {
            Self::Found { elem, .. } => Some(*elem),
            _ => None,
        }
    }
}

/// 计算点 (x, y) 相对单元 elem 的重心坐标（面积比）
///
/// 退化单元（面积趋零）返回均匀权重，由上层的病态单元规则
/// 兜底处理。
pub fn barycentric(mesh: &TriMesh, elem: usize, x: f64, y: f64) -> [f64; 3] {
    let [v0, v1, v2] = mesh.element_vertices(elem);

    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);
    if denom.abs() < 1e-300 {
        return [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
    }

    let l0 = ((v1.y - v2.y) * (x - v2.x) + (v2.x - v1.x) * (y - v2.y)) / denom;
    let l1 = ((v2.y - v0.y) * (x - v2.x) + (v0.x - v2.x) * (y - v2.y)) / denom;
    let l2 = 1.0 - l0 - l1;

    [l0, l1, l2]
}

/// 由重心坐标重建点坐标 `Σ φ_i (x_i, y_i)`
///
/// 与 [`barycentric`] 互为往返，用于一致性校验。
pub fn reconstruct_position(mesh: &TriMesh, elem: usize, phi: &[f64; 3]) -> (f64, f64) {
    let [v0, v1, v2] = mesh.element_vertices(elem);
    (
        phi[0] * v0.x + phi[1] * v1.x + phi[2] * v2.x,
        phi[0] * v0.y + phi[1] * v1.y + phi[2] * v2.y,
    )
}

/// 宿主单元定位器
///
/// 持网格只读引用，可在工作线程间共享。
#[derive(Debug, Clone, Copy)]
pub struct HostLocator<'a> {
    mesh: &'a TriMesh,
    tolerance: TrackingTolerance,
    limits: WalkLimits,
}

impl<'a> HostLocator<'a> {
    /// 以默认容差和行走限制创建定位器
    pub fn new(mesh: &'a TriMesh) -> Self {
        Self {
            mesh,
            tolerance: TrackingTolerance::default(),
            limits: WalkLimits::default(),
        }
    }

    /// 使用自定义容差创建定位器
    pub fn with_tolerance(mesh: &'a TriMesh, tolerance: TrackingTolerance) -> Self {
        Self {
            mesh,
            tolerance,
            limits: WalkLimits::default(),
        }
    }

    /// 网格引用
    #[inline]
    pub fn mesh(&self) -> &TriMesh {
        self.mesh
    }

    /// 局部行走定位
    ///
    /// 从 `start_elem` 出发查找包含 `(x, y)` 的单元。每步计算当前
    /// 单元的重心坐标：全部满足内点判据则命中；否则穿过最小
    /// 分量对应的对边进入邻居。
    ///
    /// # 平局规则
    ///
    /// 多个分量并列最小时，优先选择邻居不是陆地的边，其次不是
    /// 开边界的边；仍并列时取边号较小者。
    pub fn find_host_local(&self, start_elem: usize, x: f64, y: f64) -> HostQuery {
        let mut current = start_elem;

        for step in 0..self.limits.max_steps {
            let phi = barycentric(self.mesh, current, x, y);
            let (min_idx, min_phi) = argmin_with_ties(&phi, |edge| {
                neighbor_rank(self.mesh.neighbor(current, edge))
            });

            if self.tolerance.inside(min_phi) {
                // 病态单元规则：几何命中但 ≥2 条陆地边
                if self.mesh.n_land_edges(current) >= 2 {
                    let edge = (0..3)
                        .find(|&i| self.mesh.neighbor(current, i) == LAND)
                        .unwrap_or(min_idx);
                    return HostQuery::LandCross {
                        elem: current,
                        edge,
                    };
                }
                return HostQuery::Found {
                    elem: current,
                    phi,
                };
            }

            match self.mesh.neighbor(current, min_idx) {
                LAND => {
                    return HostQuery::LandCross {
                        elem: current,
                        edge: min_idx,
                    }
                }
                OPEN => {
                    return HostQuery::OpenCross {
                        elem: current,
                        edge: min_idx,
                    }
                }
                next => {
                    let next = next as usize;
                    // 离开起点后又绕回，说明行走成环
                    if next == start_elem && step > 0 {
                        return HostQuery::SearchFailed;
                    }
                    current = next;
                }
            }
        }

        HostQuery::SearchFailed
    }

    /// 全局扫描定位
    ///
    /// O(N_elems)，用于播种与行走失败恢复。未命中任何单元时
    /// 返回 `SearchFailed`（点在域外）。
    pub fn find_host_global(&self, x: f64, y: f64) -> HostQuery {
        for elem in 0..self.mesh.n_elems() {
            let phi = barycentric(self.mesh, elem, x, y);
            let min_phi = phi[0].min(phi[1]).min(phi[2]);
            if self.tolerance.inside(min_phi) {
                return HostQuery::Found { elem, phi };
            }
        }
        HostQuery::SearchFailed
    }
}

/// 邻居类型排序：内部 < 开边界 < 陆地
#[inline]
fn neighbor_rank(neighbor: i32) -> u8 {
    match neighbor {
        LAND => 2,
        OPEN => 1,
        _ => 0,
    }
}

/// 带平局规则的最小分量查找
///
/// 返回 (边索引, 最小值)。并列最小时按 `rank` 升序，再按边号
/// 升序选取。
fn argmin_with_ties(phi: &[f64; 3], rank: impl Fn(usize) -> u8) -> (usize, f64) {
    let min_phi = phi[0].min(phi[1]).min(phi[2]);
    let mut best: Option<usize> = None;
    for i in 0..3 {
        if phi[i] == min_phi {
            match best {
                None => best = Some(i),
                Some(b) => {
                    if rank(i) < rank(b) {
                        best = Some(i);
                    }
                }
            }
        }
    }
    (best.unwrap_or(0), min_phi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{rectangle, RectangleMeshConfig, Side};

    fn test_mesh() -> TriMesh {
        rectangle(&RectangleMeshConfig {
            nx: 4,
            ny: 3,
            dx: 1.0,
            dy: 1.0,
            x0: 0.0,
            y0: 0.0,
            depth: 20.0,
            n_siglay: 4,
            open_sides: vec![Side::East],
        })
        .unwrap()
    }

    #[test]
    fn test_barycentric_round_trip() {
        let mesh = test_mesh();
        for elem in 0..mesh.n_elems() {
            let c = mesh.centroid(elem);
            let phi = barycentric(&mesh, elem, c.x, c.y);
            let sum: f64 = phi.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);

            let (rx, ry) = reconstruct_position(&mesh, elem, &phi);
            assert!((rx - c.x).abs() < 1e-12);
            assert!((ry - c.y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_global_search_finds_centroids() {
        let mesh = test_mesh();
        let locator = HostLocator::new(&mesh);
        for elem in 0..mesh.n_elems() {
            let c = mesh.centroid(elem);
            let query = locator.find_host_global(c.x, c.y);
            assert_eq!(query.elem(), Some(elem));
        }
    }

    #[test]
    fn test_local_walk_converges_from_any_start() {
        let mesh = test_mesh();
        let locator = HostLocator::new(&mesh);
        for start in 0..mesh.n_elems() {
            for target in 0..mesh.n_elems() {
                let c = mesh.centroid(target);
                let query = locator.find_host_local(start, c.x, c.y);
                assert_eq!(
                    query.elem(),
                    Some(target),
                    "行走 {} -> {} 失败: {:?}",
                    start,
                    target,
                    query
                );
            }
        }
    }

    #[test]
    fn test_land_cross_reported() {
        let mesh = test_mesh();
        let locator = HostLocator::new(&mesh);
        // 西边界外侧一点（西边为陆地）
        let query = locator.find_host_local(0, -0.5, 0.5);
        assert!(matches!(query, HostQuery::LandCross { .. }));
    }

    #[test]
    fn test_open_cross_reported() {
        let mesh = test_mesh();
        let locator = HostLocator::new(&mesh);
        // 东边界外侧一点（东边为开边界），从东侧单元出发
        let start = mesh.n_elems() - 1;
        let query = locator.find_host_local(start, 4.5, 2.5);
        assert!(matches!(query, HostQuery::OpenCross { .. }));
    }

    #[test]
    fn test_global_search_outside_domain() {
        let mesh = test_mesh();
        let locator = HostLocator::new(&mesh);
        assert_eq!(
            locator.find_host_global(100.0, 100.0),
            HostQuery::SearchFailed
        );
    }

    #[test]
    fn test_point_on_shared_edge_inside_both() {
        let mesh = test_mesh();
        let locator = HostLocator::new(&mesh);
        // 共享边中点：两侧行走都应命中（各自判为内点）
        let c0 = mesh.centroid(0);
        let query = locator.find_host_local(1, c0.x, c0.y);
        assert!(query.is_found());
    }
}
