// crates/ml_field/src/error.rs

//! 场层错误类型

/// 场采样错误
///
/// `Io` 与 `Timeout` 为致命错误，向上传递到驱动器终止运行；
/// `NonFinite` 由驱动器就地吸收（粒子标记离域，运行继续）。
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// 数据源 IO 失败
    #[error("场数据 IO 失败: {0}")]
    Io(String),

    /// 数据源读取超时
    #[error("场数据读取超时: {0}")]
    Timeout(String),

    /// 请求时刻超出数据覆盖范围
    #[error("时刻 {t} 无可用场数据（覆盖范围 [{t_first}, {t_last})）")]
    NoDataForTime {
        /// 请求时刻 [s]
        t: f64,
        /// 数据首时刻
        t_first: f64,
        /// 数据末时刻
        t_last: f64,
    },

    /// 插值分数越界（严格模式下致命）
    #[error("插值分数越界 ({axis}): {value}")]
    OutOfRange {
        /// 越界的轴（time / sigma）
        axis: &'static str,
        /// 越界值
        value: f64,
    },

    /// 采样值非有限（NaN / Inf）
    #[error("采样值非有限: {what}")]
    NonFinite {
        /// 出错的量
        what: &'static str,
    },

    /// 粒子缺少有效宿主
    #[error("粒子缺少有效宿主单元，无法采样")]
    NoHost,
}
