// crates/ml_mesh/src/generation.rs

//! 合成网格生成
//!
//! 生成矩形域的结构化三角剖分（每个四边形切成两个三角形），
//! 带完整的 `nbe` 邻接与可配置的边界标记。用于测试套件与
//! 演示场景；真实网格由外层 IO 适配器加载。
//!
//! ```text
//!  d ---- c        每个四边形:
//!  | T1 / |          T0 = (a, b, c)
//!  |  / T0|          T1 = (a, c, d)
//!  a ---- b        节点逆时针排列
//! ```

use std::collections::HashMap;

use ndarray::Array2;

use crate::error::MeshError;
use crate::topology::{TriMesh, LAND, OPEN};

/// 矩形域的边
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// 西侧 (x = x0)
    West,
    /// 东侧 (x = x0 + nx·dx)
    East,
    /// 南侧 (y = y0)
    South,
    /// 北侧 (y = y0 + ny·dy)
    North,
}

/// 矩形网格配置
#[derive(Debug, Clone)]
pub struct RectangleMeshConfig {
    /// x 方向四边形数
    pub nx: usize,
    /// y 方向四边形数
    pub ny: usize,
    /// x 方向间距 [m]
    pub dx: f64,
    /// y 方向间距 [m]
    pub dy: f64,
    /// 原点 x
    pub x0: f64,
    /// 原点 y
    pub y0: f64,
    /// 均匀水深 [m]
    pub depth: f64,
    /// σ 层数
    pub n_siglay: usize,
    /// 标记为开边界的域边，其余为陆地
    pub open_sides: Vec<Side>,
}

impl Default for RectangleMeshConfig {
    fn default() -> Self {
        Self {
            nx: 10,
            ny: 10,
            dx: 100.0,
            dy: 100.0,
            x0: 0.0,
            y0: 0.0,
            depth: 20.0,
            n_siglay: 10,
            open_sides: Vec::new(),
        }
    }
}

/// 生成矩形三角网格
pub fn rectangle(config: &RectangleMeshConfig) -> Result<TriMesh, MeshError> {
    if config.nx == 0 || config.ny == 0 {
        return Err(MeshError::InvalidInput(
            "nx 与 ny 必须 ≥ 1".to_string(),
        ));
    }
    if config.n_siglay == 0 {
        return Err(MeshError::InvalidInput("σ 层数必须 ≥ 1".to_string()));
    }
    if !(config.dx > 0.0) || !(config.dy > 0.0) {
        return Err(MeshError::InvalidInput("dx/dy 必须为正".to_string()));
    }

    let (nx, ny) = (config.nx, config.ny);
    let n_nodes = (nx + 1) * (ny + 1);
    let node = |i: usize, j: usize| -> u32 { (j * (nx + 1) + i) as u32 };

    // 节点坐标
    let mut x = Vec::with_capacity(n_nodes);
    let mut y = Vec::with_capacity(n_nodes);
    for j in 0..=ny {
        for i in 0..=nx {
            x.push(config.x0 + i as f64 * config.dx);
            y.push(config.y0 + j as f64 * config.dy);
        }
    }

    // 单元：四边形对角切分
    let mut nv: Vec<[u32; 3]> = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let a = node(i, j);
            let b = node(i + 1, j);
            let c = node(i + 1, j + 1);
            let d = node(i, j + 1);
            nv.push([a, b, c]);
            nv.push([a, c, d]);
        }
    }

    // 边 → (单元, 边号) 映射，端点对按升序规整
    let mut edge_map: HashMap<(u32, u32), Vec<(usize, usize)>> = HashMap::new();
    for (e, nodes) in nv.iter().enumerate() {
        for edge in 0..3 {
            let a = nodes[(edge + 1) % 3];
            let b = nodes[(edge + 2) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            edge_map.entry(key).or_default().push((e, edge));
        }
    }

    // 节点所在域边判断
    let on_side = |n: u32, side: Side| -> bool {
        let i = n as usize % (nx + 1);
        let j = n as usize / (nx + 1);
        match side {
            Side::West => i == 0,
            Side::East => i == nx,
            Side::South => j == 0,
            Side::North => j == ny,
        }
    };

    let boundary_tag = |a: u32, b: u32| -> i32 {
        for side in [Side::West, Side::East, Side::South, Side::North] {
            if on_side(a, side) && on_side(b, side) {
                return if config.open_sides.contains(&side) {
                    OPEN
                } else {
                    LAND
                };
            }
        }
        LAND
    };

    // 邻接
    let mut nbe: Vec<[i32; 3]> = vec![[LAND; 3]; nv.len()];
    for (&(a, b), owners) in &edge_map {
        match owners.as_slice() {
            [(e0, k0), (e1, k1)] => {
                nbe[*e0][*k0] = *e1 as i32;
                nbe[*e1][*k1] = *e0 as i32;
            }
            [(e0, k0)] => {
                nbe[*e0][*k0] = boundary_tag(a, b);
            }
            _ => {
                return Err(MeshError::InvalidInput(format!(
                    "边 ({}, {}) 被 {} 个单元共享",
                    a,
                    b,
                    owners.len()
                )));
            }
        }
    }

    // 均匀 σ 分层
    let n_siglay = config.n_siglay;
    let n_siglev = n_siglay + 1;
    let mut siglev = Array2::zeros((n_siglev, n_nodes));
    let mut siglay = Array2::zeros((n_siglay, n_nodes));
    for k in 0..n_siglev {
        let s = -(k as f64) / n_siglay as f64;
        for n in 0..n_nodes {
            siglev[(k, n)] = s;
        }
    }
    for k in 0..n_siglay {
        let s = -(k as f64 + 0.5) / n_siglay as f64;
        for n in 0..n_nodes {
            siglay[(k, n)] = s;
        }
    }

    let h = vec![config.depth; n_nodes];

    TriMesh::new(nv, nbe, x, y, h, siglev, siglay, None, None)
}
