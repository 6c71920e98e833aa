// crates/ml_mesh/src/topology.rs

//! 三角网格拓扑数据
//!
//! [`TriMesh`] 保存水平非结构三角网格与地形跟随垂向分层的
//! 全部静态几何：
//!
//! - 单元-节点连接 `nv`（一致的节点走向）
//! - 单元-单元邻接 `nbe`（对顶点编号：第 i 边为顶点 i 的对边）
//! - 节点坐标与单元形心
//! - σ 层界面 `siglev` 与层中心 `siglay`（随节点变化，单调递减）
//! - 静水深 `h`（向下为正）
//! - 可选的 LLS 插值系数 `a1u, a2u`（第 0 行为宿主自身）
//!
//! 网格在构造时一次性校验，之后不可变。粒子更新阶段对网格
//! 的访问全部是只读的，可安全地在工作线程间共享。

use glam::DVec2;
use ndarray::Array2;

use crate::error::MeshError;

/// 陆地边界哨兵值
pub const LAND: i32 = -1;
/// 开边界哨兵值
pub const OPEN: i32 = -2;

/// 不可变三角网格
#[derive(Debug, Clone)]
pub struct TriMesh {
    /// 单元数
    n_elems: usize,
    /// 节点数
    n_nodes: usize,
    /// σ 层中心数
    n_siglay: usize,
    /// σ 层界面数（= n_siglay + 1）
    n_siglev: usize,
    /// 单元-节点连接
    nv: Vec<[u32; 3]>,
    /// 单元-单元邻接（-1 陆地，-2 开边界）
    nbe: Vec<[i32; 3]>,
    /// 节点 x 坐标
    x: Vec<f64>,
    /// 节点 y 坐标
    y: Vec<f64>,
    /// 单元形心 x
    xc: Vec<f64>,
    /// 单元形心 y
    yc: Vec<f64>,
    /// 静水深 [m]（向下为正）
    h: Vec<f64>,
    /// σ 层界面，形状 (n_siglev, n_nodes)，沿第 0 维单调递减
    siglev: Array2<f64>,
    /// σ 层中心，形状 (n_siglay, n_nodes)
    siglay: Array2<f64>,
    /// LLS 系数（x 方向），形状 (4, n_elems)；无则回退 Shepard
    a1u: Option<Array2<f64>>,
    /// LLS 系数（y 方向），形状 (4, n_elems)
    a2u: Option<Array2<f64>>,
}

impl TriMesh {
    /// 从原始数组构造网格并校验
    ///
    /// # 校验内容
    ///
    /// - 各数组长度一致
    /// - `nbe` 哨兵值合法，互为邻接的单元确实共享对应边
    /// - 每个节点的 `siglev` 单调递减且首末为 0 / -1 量级
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nv: Vec<[u32; 3]>,
        nbe: Vec<[i32; 3]>,
        x: Vec<f64>,
        y: Vec<f64>,
        h: Vec<f64>,
        siglev: Array2<f64>,
        siglay: Array2<f64>,
        a1u: Option<Array2<f64>>,
        a2u: Option<Array2<f64>>,
    ) -> Result<Self, MeshError> {
        let n_elems = nv.len();
        let n_nodes = x.len();

        if nbe.len() != n_elems {
            return Err(MeshError::SizeMismatch {
                name: "nbe",
                expected: n_elems,
                actual: nbe.len(),
            });
        }
        if y.len() != n_nodes {
            return Err(MeshError::SizeMismatch {
                name: "y",
                expected: n_nodes,
                actual: y.len(),
            });
        }
        if h.len() != n_nodes {
            return Err(MeshError::SizeMismatch {
                name: "h",
                expected: n_nodes,
                actual: h.len(),
            });
        }
        if siglev.ncols() != n_nodes {
            return Err(MeshError::SizeMismatch {
                name: "siglev",
                expected: n_nodes,
                actual: siglev.ncols(),
            });
        }
        if siglay.ncols() != n_nodes {
            return Err(MeshError::SizeMismatch {
                name: "siglay",
                expected: n_nodes,
                actual: siglay.ncols(),
            });
        }
        let n_siglev = siglev.nrows();
        let n_siglay = siglay.nrows();
        if n_siglev != n_siglay + 1 {
            return Err(MeshError::InvalidInput(format!(
                "σ 界面数 {} 应为层中心数 {} + 1",
                n_siglev, n_siglay
            )));
        }
        if let Some(a) = &a1u {
            if a.nrows() != 4 || a.ncols() != n_elems {
                return Err(MeshError::SizeMismatch {
                    name: "a1u",
                    expected: 4 * n_elems,
                    actual: a.nrows() * a.ncols(),
                });
            }
        }
        if let Some(a) = &a2u {
            if a.nrows() != 4 || a.ncols() != n_elems {
                return Err(MeshError::SizeMismatch {
                    name: "a2u",
                    expected: 4 * n_elems,
                    actual: a.nrows() * a.ncols(),
                });
            }
        }

        // σ 单调性
        for node in 0..n_nodes {
            for k in 1..n_siglev {
                if siglev[(k, node)] >= siglev[(k - 1, node)] {
                    return Err(MeshError::NonMonotonicSigma { node });
                }
            }
        }

        // 邻接互证：nbe[i,e] = e' ⇒ e' 共享顶点 i 的对边
        for (e, neighbors) in nbe.iter().enumerate() {
            for (i, &n) in neighbors.iter().enumerate() {
                if n == LAND || n == OPEN {
                    continue;
                }
                if n < 0 || n as usize >= n_elems {
                    return Err(MeshError::InvalidNeighbor {
                        elem: e,
                        edge: i,
                        value: n,
                    });
                }
                let (a, b) = edge_node_pair(&nv[e], i);
                let other = &nv[n as usize];
                let shared =
                    other.contains(&a) && other.contains(&b);
                if !shared {
                    return Err(MeshError::BrokenAdjacency {
                        elem: e,
                        edge: i,
                        neighbor: n as usize,
                    });
                }
            }
        }

        // 形心
        let mut xc = Vec::with_capacity(n_elems);
        let mut yc = Vec::with_capacity(n_elems);
        for nodes in &nv {
            let mut cx = 0.0;
            let mut cy = 0.0;
            for &node in nodes {
                cx += x[node as usize];
                cy += y[node as usize];
            }
            xc.push(cx / 3.0);
            yc.push(cy / 3.0);
        }

        Ok(Self {
            n_elems,
            n_nodes,
            n_siglay,
            n_siglev,
            nv,
            nbe,
            x,
            y,
            xc,
            yc,
            h,
            siglev,
            siglay,
            a1u,
            a2u,
        })
    }

    // ------------------------------------------------------------
    // 规模
    // ------------------------------------------------------------

    /// 单元数
    #[inline]
    pub fn n_elems(&self) -> usize {
        self.n_elems
    }

    /// 节点数
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// σ 层中心数
    #[inline]
    pub fn n_siglay(&self) -> usize {
        self.n_siglay
    }

    /// σ 层界面数
    #[inline]
    pub fn n_siglev(&self) -> usize {
        self.n_siglev
    }

    // ------------------------------------------------------------
    // 连接与坐标
    // ------------------------------------------------------------

    /// 单元的三个节点索引
    #[inline]
    pub fn element_nodes(&self, elem: usize) -> [usize; 3] {
        let nodes = self.nv[elem];
        [nodes[0] as usize, nodes[1] as usize, nodes[2] as usize]
    }

    /// 跨第 edge 边的邻居（可能为 [`LAND`] / [`OPEN`]）
    #[inline]
    pub fn neighbor(&self, elem: usize, edge: usize) -> i32 {
        self.nbe[elem][edge]
    }

    /// 第 edge 边（顶点 edge 的对边）的两个端点节点
    #[inline]
    pub fn edge_nodes(&self, elem: usize, edge: usize) -> (usize, usize) {
        let (a, b) = edge_node_pair(&self.nv[elem], edge);
        (a as usize, b as usize)
    }

    /// 节点坐标
    #[inline]
    pub fn node_position(&self, node: usize) -> DVec2 {
        DVec2::new(self.x[node], self.y[node])
    }

    /// 单元形心
    #[inline]
    pub fn centroid(&self, elem: usize) -> DVec2 {
        DVec2::new(self.xc[elem], self.yc[elem])
    }

    /// 单元三个顶点的坐标
    #[inline]
    pub fn element_vertices(&self, elem: usize) -> [DVec2; 3] {
        let [a, b, c] = self.element_nodes(elem);
        [
            self.node_position(a),
            self.node_position(b),
            self.node_position(c),
        ]
    }

    /// 单元的陆地边数
    #[inline]
    pub fn n_land_edges(&self, elem: usize) -> usize {
        self.nbe[elem].iter().filter(|&&n| n == LAND).count()
    }

    /// 单元是否含任何边界边（陆地或开边界）
    #[inline]
    pub fn is_boundary_element(&self, elem: usize) -> bool {
        self.nbe[elem].iter().any(|&n| n < 0)
    }

    // ------------------------------------------------------------
    // 标量场（节点）在单元内取值
    // ------------------------------------------------------------

    /// 静水深在 (φ, 单元) 处的插值 [m]
    #[inline]
    pub fn bathymetry_at(&self, elem: usize, phi: &[f64; 3]) -> f64 {
        let [a, b, c] = self.element_nodes(elem);
        self.h[a] * phi[0] + self.h[b] * phi[1] + self.h[c] * phi[2]
    }

    /// 节点静水深
    #[inline]
    pub fn bathymetry_node(&self, node: usize) -> f64 {
        self.h[node]
    }

    /// σ 界面值在 (φ, 单元) 处的插值
    #[inline]
    pub fn siglev_at(&self, elem: usize, phi: &[f64; 3], k: usize) -> f64 {
        let [a, b, c] = self.element_nodes(elem);
        self.siglev[(k, a)] * phi[0] + self.siglev[(k, b)] * phi[1] + self.siglev[(k, c)] * phi[2]
    }

    /// σ 层中心值在 (φ, 单元) 处的插值
    #[inline]
    pub fn siglay_at(&self, elem: usize, phi: &[f64; 3], k: usize) -> f64 {
        let [a, b, c] = self.element_nodes(elem);
        self.siglay[(k, a)] * phi[0] + self.siglay[(k, b)] * phi[1] + self.siglay[(k, c)] * phi[2]
    }

    /// LLS 系数（x 方向）：`a1u[(j, elem)]`，j=0 为宿主
    #[inline]
    pub fn a1u(&self) -> Option<&Array2<f64>> {
        self.a1u.as_ref()
    }

    /// LLS 系数（y 方向）
    #[inline]
    pub fn a2u(&self) -> Option<&Array2<f64>> {
        self.a2u.as_ref()
    }

    // ------------------------------------------------------------
    // 线性基函数
    // ------------------------------------------------------------

    /// 单元线性基函数的常值梯度 `[(∂φ_i/∂x, ∂φ_i/∂y); 3]`
    ///
    /// 节点标量场在单元内的梯度为 `Σ f_i ∇φ_i`，随单元为常数。
    /// 用于水平涡粘性梯度等闭式梯度计算。
    pub fn basis_gradients(&self, elem: usize) -> [DVec2; 3] {
        let [v0, v1, v2] = self.element_vertices(elem);
        // 2 倍有向面积
        let det = (v1.x - v0.x) * (v2.y - v0.y) - (v2.x - v0.x) * (v1.y - v0.y);
        let inv = 1.0 / det;
        [
            DVec2::new((v1.y - v2.y) * inv, (v2.x - v1.x) * inv),
            DVec2::new((v2.y - v0.y) * inv, (v0.x - v2.x) * inv),
            DVec2::new((v0.y - v1.y) * inv, (v1.x - v0.x) * inv),
        ]
    }
}

/// 第 edge 边（顶点 edge 的对边）的节点对
#[inline]
fn edge_node_pair(nodes: &[u32; 3], edge: usize) -> (u32, u32) {
    (nodes[(edge + 1) % 3], nodes[(edge + 2) % 3])
}
