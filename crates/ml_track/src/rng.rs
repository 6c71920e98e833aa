// crates/ml_track/src/rng.rs

//! 粒子独立随机数流
//!
//! 每个粒子携带一条独立的 ChaCha8 流，种子由
//! `(模拟种子, 粒子 id)` 经 splitmix64 混合确定。单步内各
//! 子方法按固定顺序消费抽样，因此 `(种子, 粒子, 步, 子步)`
//! 四元组唯一决定每次抽样——并行调度不改变轨迹，相同种子
//! 复播得到逐位一致的结果。

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 均匀抽样 `R ~ U(-1, 1)` 的方差 `r = Var(R) = 1/3`
///
/// 随机游走的步幅项 `R·√(2·k·Δt / r)` 依赖该常数使
/// `Var(步幅) = 2·k·Δt` 成立。
pub const UNIFORM_VARIANCE: f64 = 1.0 / 3.0;

/// splitmix64 混合函数
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// 粒子随机数流
#[derive(Debug, Clone)]
pub struct ParticleRng {
    inner: ChaCha8Rng,
}

impl ParticleRng {
    /// 由模拟种子与粒子 id 派生独立流
    pub fn new(sim_seed: u64, particle_id: u64) -> Self {
        let mixed = splitmix64(sim_seed ^ splitmix64(particle_id));
        Self {
            inner: ChaCha8Rng::seed_from_u64(mixed),
        }
    }

    /// 均匀抽样 `U(-1, 1)`
    #[inline]
    pub fn uniform_unit(&mut self) -> f64 {
        self.inner.gen_range(-1.0..=1.0)
    }
}
