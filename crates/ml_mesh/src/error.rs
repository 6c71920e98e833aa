// crates/ml_mesh/src/error.rs

//! 网格层错误类型

/// 网格错误
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// 数组大小不匹配
    #[error("大小不匹配 '{name}': 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 邻接关系不自洽
    #[error("邻接不变量被破坏: 单元 {elem} 第 {edge} 边指向 {neighbor}，但对方不共享该边")]
    BrokenAdjacency {
        /// 单元索引
        elem: usize,
        /// 边索引（对顶点编号）
        edge: usize,
        /// 邻居单元索引
        neighbor: usize,
    },

    /// 无效的邻接哨兵值
    #[error("单元 {elem} 第 {edge} 边的邻接值 {value} 无效（允许 ≥0、-1、-2）")]
    InvalidNeighbor {
        /// 单元索引
        elem: usize,
        /// 边索引
        edge: usize,
        /// 邻接值
        value: i32,
    },

    /// σ 分层非单调
    #[error("节点 {node} 的 σ 层值非单调递减")]
    NonMonotonicSigma {
        /// 节点索引
        node: usize,
    },

    /// 无效输入
    #[error("无效输入: {0}")]
    InvalidInput(String),
}
