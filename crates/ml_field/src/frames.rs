// crates/ml_field/src/frames.rs

//! 场快照与时间框架
//!
//! 每个场量 f ∈ {ζ, u, v, ω, k_h, A_h} 维护一对快照
//! `(last, next)`，覆盖当前模拟时刻 `t_last ≤ t < t_next`。
//! [`FrameBuffer::read_data`] 在 t 离开覆盖区间时向前推进读取
//! 框架；推进发生在粒子扇出之间（驱动器独占 `&mut`），对粒子
//! 更新而言是原子的——任何粒子都不会看到半更新的快照对。
//!
//! 快照来源抽象为 [`SnapshotProvider`]：文件格式适配器
//! （netCDF 等）在核心之外实现该接口；测试与演示使用
//! [`InMemorySnapshots`]。

use ndarray::Array2;

use crate::error::FieldError;
use ml_mesh::TriMesh;

// ============================================================
// 单时刻快照
// ============================================================

/// 单时刻场快照
///
/// 交错布置：`u, v` 在单元中心 × σ 层中心；`omega, kh` 在节点
/// × σ 界面；`zeta` 在节点；`ah` 在节点 × σ 层中心。
#[derive(Debug, Clone)]
pub struct FieldFrame {
    /// 快照时刻 [s]
    pub time: f64,
    /// 海面高度 [m]，节点
    pub zeta: Vec<f64>,
    /// x 流速 [m/s]，(n_siglay, n_elems)
    pub u: Array2<f64>,
    /// y 流速 [m/s]，(n_siglay, n_elems)
    pub v: Array2<f64>,
    /// σ 垂向速度 [1/s]，(n_siglev, n_nodes)
    pub omega: Array2<f64>,
    /// 垂向涡扩散系数 [m²/s]，(n_siglev, n_nodes)
    pub kh: Array2<f64>,
    /// 水平涡粘性 [m²/s]，(n_siglay, n_nodes)
    pub ah: Array2<f64>,
    /// 湿单元掩码
    pub wet: Vec<bool>,
}

impl FieldFrame {
    /// 创建与网格规模匹配的零值快照
    pub fn zeros(mesh: &TriMesh, time: f64) -> Self {
        let (ne, nn) = (mesh.n_elems(), mesh.n_nodes());
        let (nlay, nlev) = (mesh.n_siglay(), mesh.n_siglev());
        Self {
            time,
            zeta: vec![0.0; nn],
            u: Array2::zeros((nlay, ne)),
            v: Array2::zeros((nlay, ne)),
            omega: Array2::zeros((nlev, nn)),
            kh: Array2::zeros((nlev, nn)),
            ah: Array2::zeros((nlay, nn)),
            wet: vec![true; ne],
        }
    }

    /// 校验快照与网格规模一致
    pub fn matches(&self, mesh: &TriMesh) -> bool {
        self.zeta.len() == mesh.n_nodes()
            && self.u.dim() == (mesh.n_siglay(), mesh.n_elems())
            && self.v.dim() == (mesh.n_siglay(), mesh.n_elems())
            && self.omega.dim() == (mesh.n_siglev(), mesh.n_nodes())
            && self.kh.dim() == (mesh.n_siglev(), mesh.n_nodes())
            && self.ah.dim() == (mesh.n_siglay(), mesh.n_nodes())
            && self.wet.len() == mesh.n_elems()
    }
}

// ============================================================
// 快照提供者
// ============================================================

/// 快照提供者接口
///
/// 核心与外层 IO 的边界：实现负责实际读取（可能阻塞、可能
/// 超时），核心只按索引请求。时刻序列要求严格单调递增。
pub trait SnapshotProvider: Send + Sync {
    /// 快照数
    fn n_frames(&self) -> usize;

    /// 第 idx 个快照的时刻 [s]
    fn frame_time(&self, idx: usize) -> f64;

    /// 加载第 idx 个快照
    ///
    /// 失败以 [`FieldError::Io`] / [`FieldError::Timeout`] 报告，
    /// 属致命错误。
    fn load_frame(&self, idx: usize) -> Result<FieldFrame, FieldError>;
}

/// 内存快照序列
///
/// 测试与演示用提供者：全部快照常驻内存，`load_frame` 克隆。
pub struct InMemorySnapshots {
    frames: Vec<FieldFrame>,
}

impl InMemorySnapshots {
    /// 从快照序列创建（按时刻严格递增）
    ///
    /// # Panics
    ///
    /// 快照少于 2 个或时刻非严格递增时 panic。
    pub fn new(frames: Vec<FieldFrame>) -> Self {
        assert!(frames.len() >= 2, "时间框架至少需要 2 个快照");
        for w in frames.windows(2) {
            assert!(
                w[1].time > w[0].time,
                "快照时刻必须严格递增: {} <= {}",
                w[1].time,
                w[0].time
            );
        }
        Self { frames }
    }
}

impl SnapshotProvider for InMemorySnapshots {
    fn n_frames(&self) -> usize {
        self.frames.len()
    }

    fn frame_time(&self, idx: usize) -> f64 {
        self.frames[idx].time
    }

    fn load_frame(&self, idx: usize) -> Result<FieldFrame, FieldError> {
        Ok(self.frames[idx].clone())
    }
}

// ============================================================
// 双缓冲时间框架
// ============================================================

/// 双缓冲时间框架
///
/// 持有 `(last, next)` 快照对与其在提供者中的索引。
pub struct FrameBuffer {
    last: FieldFrame,
    next: FieldFrame,
    idx_last: usize,
}

impl FrameBuffer {
    /// 在时刻 t 初始化框架
    pub fn initialise(provider: &dyn SnapshotProvider, t: f64) -> Result<Self, FieldError> {
        let idx = Self::bracket_index(provider, t)?;
        Ok(Self {
            last: provider.load_frame(idx)?,
            next: provider.load_frame(idx + 1)?,
            idx_last: idx,
        })
    }

    /// 当前框架是否覆盖时刻 t
    #[inline]
    pub fn covers(&self, t: f64) -> bool {
        self.last.time <= t && t < self.next.time
    }

    /// 推进读取框架使其覆盖时刻 t
    ///
    /// 已覆盖时是无操作（幂等）。相邻推进复用 next 快照，只加载
    /// 一个新快照；跳跃推进重载两个。
    pub fn read_data(&mut self, provider: &dyn SnapshotProvider, t: f64) -> Result<(), FieldError> {
        if self.covers(t) {
            return Ok(());
        }
        let idx = Self::bracket_index(provider, t)?;
        if idx == self.idx_last + 1 {
            std::mem::swap(&mut self.last, &mut self.next);
            self.next = provider.load_frame(idx + 1)?;
        } else {
            self.last = provider.load_frame(idx)?;
            self.next = provider.load_frame(idx + 1)?;
        }
        self.idx_last = idx;
        Ok(())
    }

    /// 时间框架下界快照
    #[inline]
    pub fn last(&self) -> &FieldFrame {
        &self.last
    }

    /// 时间框架上界快照
    #[inline]
    pub fn next(&self) -> &FieldFrame {
        &self.next
    }

    /// 框架覆盖区间 `[t_last, t_next)`
    #[inline]
    pub fn interval(&self) -> (f64, f64) {
        (self.last.time, self.next.time)
    }

    /// 查找覆盖 t 的快照索引对 `(idx, idx+1)`
    fn bracket_index(provider: &dyn SnapshotProvider, t: f64) -> Result<usize, FieldError> {
        let n = provider.n_frames();
        let t_first = provider.frame_time(0);
        let t_last = provider.frame_time(n - 1);
        if t < t_first || t >= t_last {
            return Err(FieldError::NoDataForTime {
                t,
                t_first,
                t_last,
            });
        }
        // 快照数通常很小，线性扫描即可
        for idx in (0..n - 1).rev() {
            if provider.frame_time(idx) <= t {
                return Ok(idx);
            }
        }
        Err(FieldError::NoDataForTime {
            t,
            t_first,
            t_last,
        })
    }
}
