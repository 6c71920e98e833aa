// crates/ml_track/src/particle.rs

//! 粒子状态
//!
//! 粒子由驱动器独占持有与变更；采样器与迭代方法只接收只读
//! 视图和输出位移累加器 [`Delta`]。种子向量单独保留，支持
//! 集合（ensemble）复播。
//!
//! # 状态机
//!
//! ```text
//! Active ─(开边界/搜索失败/NaN)→ OutOfDomain   (终态)
//! Active ─(z < zmin, 底部吸收)→ Absorbed       (终态)
//! Active ─(宿主变干, 允许搁浅)→ Beached ─(复湿)→ Active
//! ```

use ml_field::SpatialCoords;

use crate::rng::ParticleRng;

/// 粒子状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleStatus {
    /// 活跃：参与步进与诊断
    #[default]
    Active,
    /// 离域：越过开边界或不可恢复的定位失败（终态）
    OutOfDomain,
    /// 搁浅：宿主单元为干，等待复湿
    Beached,
    /// 被底床吸收（终态）
    Absorbed,
}

impl ParticleStatus {
    /// 是否终态（不再步进、不再计入诊断）
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::OutOfDomain | Self::Absorbed)
    }

    /// 是否活跃
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// 单步位移累加器
///
/// 每次 `NumMethod::step` 前清零；各迭代方法只写入自身贡献。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Delta {
    /// x 方向位移（网格坐标单位）
    pub dx: f64,
    /// y 方向位移
    pub dy: f64,
    /// 垂向位移（垂向坐标单位）
    pub dz: f64,
}

impl Delta {
    /// 清零
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 拉格朗日粒子
#[derive(Debug, Clone)]
pub struct Particle {
    /// 粒子 id（播种顺序，RNG 流种子的一部分）
    pub id: u64,
    /// 分组 id（释放批次）
    pub group_id: u32,
    /// 状态
    pub status: ParticleStatus,
    /// 空间坐标与网格缓存
    pub coords: SpatialCoords,
    /// 独立随机数流
    pub rng: ParticleRng,
}

impl Particle {
    /// 创建粒子（未定位，状态 Active）
    pub fn new(id: u64, group_id: u32, x: f64, y: f64, z: f64, sim_seed: u64) -> Self {
        Self {
            id,
            group_id,
            status: ParticleStatus::Active,
            coords: SpatialCoords::new(x, y, z),
            rng: ParticleRng::new(sim_seed, id),
        }
    }

    /// 是否搁浅
    #[inline]
    pub fn is_beached(&self) -> bool {
        self.status == ParticleStatus::Beached
    }
}

/// 单粒子诊断快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleDiagnostics {
    /// 粒子 id
    pub id: u64,
    /// 分组 id
    pub group_id: u32,
    /// 位置
    pub x1: f64,
    /// 位置
    pub x2: f64,
    /// 位置（垂向坐标单位）
    pub x3: f64,
    /// 宿主单元
    pub host: usize,
    /// 静水深 [m]
    pub h: f64,
    /// 海面高度 [m]
    pub zeta: f64,
    /// 状态
    pub status: ParticleStatus,
}

/// 单步汇总
///
/// 每个工作线程独立累加，屏障处合并。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    /// 活跃粒子数
    pub n_active: usize,
    /// 离域粒子数
    pub n_out_of_domain: usize,
    /// 搁浅粒子数
    pub n_beached: usize,
    /// 被吸收粒子数
    pub n_absorbed: usize,
}

impl StepSummary {
    /// 单粒子的汇总贡献
    pub fn of(particle: &Particle) -> Self {
        let mut s = Self::default();
        match particle.status {
            ParticleStatus::Active => s.n_active = 1,
            ParticleStatus::OutOfDomain => s.n_out_of_domain = 1,
            ParticleStatus::Beached => s.n_beached = 1,
            ParticleStatus::Absorbed => s.n_absorbed = 1,
        }
        s
    }

    /// 合并两个汇总
    pub fn merged(self, other: Self) -> Self {
        Self {
            n_active: self.n_active + other.n_active,
            n_out_of_domain: self.n_out_of_domain + other.n_out_of_domain,
            n_beached: self.n_beached + other.n_beached,
            n_absorbed: self.n_absorbed + other.n_absorbed,
        }
    }

    /// 总粒子数
    #[inline]
    pub fn total(&self) -> usize {
        self.n_active + self.n_out_of_domain + self.n_beached + self.n_absorbed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_machine_predicates() {
        assert!(ParticleStatus::Active.is_active());
        assert!(!ParticleStatus::Beached.is_terminal());
        assert!(ParticleStatus::OutOfDomain.is_terminal());
        assert!(ParticleStatus::Absorbed.is_terminal());
    }

    #[test]
    fn test_delta_reset() {
        let mut d = Delta {
            dx: 1.0,
            dy: 2.0,
            dz: 3.0,
        };
        d.reset();
        assert_eq!(d, Delta::default());
    }

    #[test]
    fn test_summary_merge() {
        let a = StepSummary {
            n_active: 3,
            n_beached: 1,
            ..Default::default()
        };
        let b = StepSummary {
            n_active: 2,
            n_absorbed: 4,
            ..Default::default()
        };
        let m = a.merged(b);
        assert_eq!(m.n_active, 5);
        assert_eq!(m.n_absorbed, 4);
        assert_eq!(m.total(), 10);
    }
}
