// crates/ml_track/src/boundary.rs

//! 边界条件计算器
//!
//! - 水平：镜面反射 / 复位。反射以穿越线段与边界边的交点为
//!   支点做镜像；地理网格先投影到局部切平面再反射。
//! - 垂向：表底反射 / 底部吸收（表面仍反射）。反射最多执行
//!   两次，处理一次反射冲出对侧边界的情形，仍越界则钳位。
//!
//! 计算器在启动期由配置确定一次，粒子更新阶段按值复制，热路
//! 径上没有动态分发。

use glam::DVec2;

use ml_config::{HorizBoundaryKind, VertBoundaryKind};
use ml_mesh::TriMesh;

use crate::geo::CoordinateTransform;

// ============================================================
// 水平边界
// ============================================================

/// 水平边界条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalBoundary {
    /// 镜面反射
    Reflecting,
    /// 复位：退回步前位置
    Restoring,
    /// 不处理
    None,
}

impl HorizontalBoundary {
    /// 从配置创建
    pub fn from_config(kind: HorizBoundaryKind) -> Self {
        match kind {
            HorizBoundaryKind::Reflecting => Self::Reflecting,
            HorizBoundaryKind::Restoring => Self::Restoring,
            HorizBoundaryKind::None => Self::None,
        }
    }

    /// 对越过陆地边界的位移计算校正位置
    ///
    /// `elem`/`edge` 为行走报告的最后域内单元与被越过的边。
    /// 返回 `None` 表示无法校正（配置为不处理，或反射几何
    /// 失败），由调用方决定离域或复位。
    pub fn apply(
        &self,
        mesh: &TriMesh,
        transform: &CoordinateTransform,
        old: DVec2,
        new: DVec2,
        elem: usize,
        edge: usize,
    ) -> Option<DVec2> {
        match self {
            Self::None => None,
            Self::Restoring => Some(old),
            Self::Reflecting => {
                // 切平面内反射（笛卡尔网格下投影是恒等的）
                let o = DVec2::ZERO;
                let n_p = transform.to_tangent(old, new);

                // 先试行走报告的边，再退而试单元的其它边界边
                let mut edges = vec![edge];
                for i in 0..3 {
                    if i != edge && mesh.neighbor(elem, i) < 0 {
                        edges.push(i);
                    }
                }
                for &e in &edges {
                    let (na, nb) = mesh.edge_nodes(elem, e);
                    let x1 = transform.to_tangent(old, mesh.node_position(na));
                    let x2 = transform.to_tangent(old, mesh.node_position(nb));
                    if let Some(reflected) = reflect_across_edge(o, n_p, x1, x2) {
                        return Some(transform.from_tangent(old, reflected));
                    }
                }
                None
            }
        }
    }
}

/// 线段 `o → p` 穿越边 `(x1, x2)` 的镜面反射
///
/// 交点 `xi`，剩余位移 `d = p - xi`，边法向
/// `n = (x2.y - x1.y, x1.x - x2.x)`：
/// `p' = xi + d - 2·(n·d)/(n·n)·n`。
///
/// 线段与边所在直线不相交（平行或交点在线段外）时返回 `None`。
fn reflect_across_edge(o: DVec2, p: DVec2, x1: DVec2, x2: DVec2) -> Option<DVec2> {
    let v = p - o;
    let w = x2 - x1;
    let denom = v.perp_dot(w);
    if denom.abs() < 1e-14 {
        return None;
    }
    let s = (x1 - o).perp_dot(w) / denom;
    if !(-1e-9..=1.0 + 1e-9).contains(&s) {
        return None;
    }
    let xi = o + s * v;
    let d = p - xi;
    let n = DVec2::new(x2.y - x1.y, x1.x - x2.x);
    let nn = n.dot(n);
    if nn < 1e-300 {
        return None;
    }
    Some(xi + d - 2.0 * n.dot(d) / nn * n)
}

// ============================================================
// 垂向边界
// ============================================================

/// 垂向边界条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalBoundary {
    /// 表底均反射
    Reflecting,
    /// 底部吸收，表面反射
    AbsorbingBottom,
    /// 不处理
    None,
}

/// 垂向边界处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalOutcome {
    /// 校正后的垂向位置
    InRange(f64),
    /// 粒子被底床吸收（终态）
    Absorbed,
}

impl VerticalBoundary {
    /// 从配置创建
    pub fn from_config(kind: VertBoundaryKind) -> Self {
        match kind {
            VertBoundaryKind::Reflecting => Self::Reflecting,
            VertBoundaryKind::AbsorbingBottom => Self::AbsorbingBottom,
            VertBoundaryKind::None => Self::None,
        }
    }

    /// 对垂向位置应用边界条件
    pub fn apply(&self, z: f64, zmin: f64, zmax: f64) -> VerticalOutcome {
        match self {
            Self::None => VerticalOutcome::InRange(z),
            Self::Reflecting => VerticalOutcome::InRange(reflect_vertical(z, zmin, zmax)),
            Self::AbsorbingBottom => {
                if z < zmin {
                    return VerticalOutcome::Absorbed;
                }
                if z > zmax {
                    let reflected = 2.0 * zmax - z;
                    if reflected < zmin {
                        return VerticalOutcome::Absorbed;
                    }
                    return VerticalOutcome::InRange(reflected);
                }
                VerticalOutcome::InRange(z)
            }
        }
    }
}

/// 垂向镜面反射：最多两次，仍越界则钳位到远端
fn reflect_vertical(mut z: f64, zmin: f64, zmax: f64) -> f64 {
    for _ in 0..2 {
        if z > zmax {
            z = 2.0 * zmax - z;
        } else if z < zmin {
            z = 2.0 * zmin - z;
        } else {
            break;
        }
    }
    z.clamp(zmin, zmax)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_config::CoordinateSystem;
    use ml_mesh::generation::{rectangle, RectangleMeshConfig};
    use ml_mesh::{HostLocator, HostQuery};

    fn transform() -> CoordinateTransform {
        CoordinateTransform::new(CoordinateSystem::Cartesian)
    }

    #[test]
    fn test_vertical_reflection_symmetry() {
        // 越过表面 δ → 回到表面下 δ
        let out = VerticalBoundary::Reflecting.apply(0.1, -1.0, 0.0);
        assert_eq!(out, VerticalOutcome::InRange(-0.1));
        // 越过底面 δ → 回到底面上 δ
        let out = VerticalBoundary::Reflecting.apply(-1.3, -1.0, 0.0);
        assert!(matches!(out, VerticalOutcome::InRange(z) if (z + 0.7).abs() < 1e-12));
    }

    #[test]
    fn test_vertical_double_reflection_then_clamp() {
        // 大幅越界：一次反射冲出对侧，再反射一次，仍越界则钳位
        let out = VerticalBoundary::Reflecting.apply(1.5, -1.0, 0.0);
        match out {
            VerticalOutcome::InRange(z) => assert!((-1.0..=0.0).contains(&z)),
            _ => panic!("不应吸收"),
        }
        let out = VerticalBoundary::Reflecting.apply(-5.0, -1.0, 0.0);
        match out {
            VerticalOutcome::InRange(z) => assert!((-1.0..=0.0).contains(&z)),
            _ => panic!("不应吸收"),
        }
    }

    #[test]
    fn test_absorbing_bottom() {
        let out = VerticalBoundary::AbsorbingBottom.apply(-1.01, -1.0, 0.0);
        assert_eq!(out, VerticalOutcome::Absorbed);
        // 表面仍反射
        let out = VerticalBoundary::AbsorbingBottom.apply(0.2, -1.0, 0.0);
        assert_eq!(out, VerticalOutcome::InRange(-0.2));
    }

    #[test]
    fn test_horizontal_reflection_normal_incidence() {
        // 法向入射西侧陆地边界，越界 δ → 回到界内 δ
        let mesh = rectangle(&RectangleMeshConfig {
            nx: 2,
            ny: 2,
            dx: 1.0,
            dy: 1.0,
            ..Default::default()
        })
        .unwrap();
        let locator = HostLocator::new(&mesh);

        let old = DVec2::new(0.3, 1.0);
        let delta = 0.05;
        let new = DVec2::new(-delta, 1.0);

        let start = locator.find_host_global(old.x, old.y).elem().unwrap();
        let query = locator.find_host_local(start, new.x, new.y);
        let (elem, edge) = match query {
            HostQuery::LandCross { elem, edge } => (elem, edge),
            other => panic!("期望陆地穿越, 得到 {:?}", other),
        };

        let corrected = HorizontalBoundary::Reflecting
            .apply(&mesh, &transform(), old, new, elem, edge)
            .unwrap();
        assert!((corrected.x - delta).abs() < 1e-10, "x = {}", corrected.x);
        assert!((corrected.y - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_horizontal_reflection_oblique() {
        // 斜入射：切向分量保持，法向分量镜像
        let mesh = rectangle(&RectangleMeshConfig {
            nx: 2,
            ny: 2,
            dx: 1.0,
            dy: 1.0,
            ..Default::default()
        })
        .unwrap();
        let locator = HostLocator::new(&mesh);

        let old = DVec2::new(0.2, 0.8);
        let new = DVec2::new(-0.1, 1.1);
        let start = locator.find_host_global(old.x, old.y).elem().unwrap();
        let (elem, edge) = match locator.find_host_local(start, new.x, new.y) {
            HostQuery::LandCross { elem, edge } => (elem, edge),
            other => panic!("期望陆地穿越, 得到 {:?}", other),
        };

        let corrected = HorizontalBoundary::Reflecting
            .apply(&mesh, &transform(), old, new, elem, edge)
            .unwrap();
        assert!((corrected.x - 0.1).abs() < 1e-10);
        assert!((corrected.y - 1.1).abs() < 1e-10);
    }

    #[test]
    fn test_restoring_returns_old_position() {
        let mesh = rectangle(&RectangleMeshConfig::default()).unwrap();
        let old = DVec2::new(50.0, 50.0);
        let new = DVec2::new(-10.0, 50.0);
        let corrected = HorizontalBoundary::Restoring
            .apply(&mesh, &transform(), old, new, 0, 0)
            .unwrap();
        assert_eq!(corrected, old);
    }

    #[test]
    fn test_none_gives_no_correction() {
        let mesh = rectangle(&RectangleMeshConfig::default()).unwrap();
        let corrected = HorizontalBoundary::None.apply(
            &mesh,
            &transform(),
            DVec2::new(50.0, 50.0),
            DVec2::new(-10.0, 50.0),
            0,
            0,
        );
        assert!(corrected.is_none());
    }
}
