// crates/ml_config/src/error.rs

//! 配置层错误类型

use chrono::NaiveDateTime;

/// 配置错误
///
/// 在启动期校验阶段产生，属于致命错误：任何一项校验失败
/// 都会阻止模拟进入主循环。变体按校验类别划分，错误信息
/// 直接给出违反的约束，便于在配置文件中定位修正。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 数值越出允许范围
    #[error("配置项 {key} = {value} 越出允许范围: {requirement}")]
    OutOfRange {
        /// 配置键
        key: &'static str,
        /// 实际值
        value: f64,
        /// 违反的约束
        requirement: &'static str,
    },

    /// 模拟时间窗口为空或倒置
    #[error("模拟时间窗口无效: 结束时刻 {end} 不晚于起始时刻 {start}")]
    EmptyTimeWindow {
        /// 起始时刻
        start: NaiveDateTime,
        /// 结束时刻
        end: NaiveDateTime,
    },

    /// 互斥配置同时启用
    #[error("互斥配置: {0} 与 {1} 不能同时启用")]
    MutuallyExclusive(&'static str, &'static str),

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_names_key_and_requirement() {
        let err = ConfigError::OutOfRange {
            key: "numerics.n_inner_steps",
            value: 0.0,
            requirement: "内层子步数应 ≥ 1",
        };
        let msg = err.to_string();
        assert!(msg.contains("numerics.n_inner_steps"));
        assert!(msg.contains("≥ 1"));
    }

    #[test]
    fn empty_time_window_reports_both_endpoints() {
        use chrono::NaiveDate;
        let t = NaiveDate::from_ymd_opt(2020, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let err = ConfigError::EmptyTimeWindow { start: t, end: t };
        let msg = err.to_string();
        assert!(msg.contains("2020-06-01"));
        assert!(msg.contains("不晚于"));
    }
}
