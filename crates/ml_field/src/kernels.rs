// crates/ml_field/src/kernels.rs

//! 插值核
//!
//! 采样器共用的插值原语：
//!
//! - 三角形内线性插值（重心坐标加权）
//! - 时间线性插值分数
//! - σ 方向层括号定位与线性混合
//! - 单元中心矢量场的 LLS 水平插值与 Shepard 反距离加权回退
//!
//! 所有函数均为纯函数，不触碰网格以外的状态。

use glam::DVec2;
use ndarray::Array2;
use tracing::warn;

use crate::error::FieldError;
use ml_mesh::TriMesh;

/// 三角形内线性插值 `Σ f_i · φ_i`
///
/// 调用方保证 `φ` 有限且 `Σφ = 1`。
#[inline]
pub fn interp_in_triangle(values: &[f64; 3], phi: &[f64; 3]) -> f64 {
    values[0] * phi[0] + values[1] * phi[1] + values[2] * phi[2]
}

/// 时间插值分数 `α = (t - t_last) / (t_next - t_last)`
///
/// 正常情况下 `α ∈ [0, 1)`。越界时严格模式返回错误；宽松模式
/// 在 debug 构建直接断言失败，release 构建记一条 warn 后钳位
/// 到 `[0, 1]`。
pub fn time_fraction(
    t: f64,
    t_last: f64,
    t_next: f64,
    strict: bool,
) -> Result<f64, FieldError> {
    let span = t_next - t_last;
    debug_assert!(span > 0.0, "时间框架区间非正: [{}, {})", t_last, t_next);
    let alpha = (t - t_last) / span;
    if !(0.0..=1.0).contains(&alpha) {
        if strict {
            return Err(FieldError::OutOfRange {
                axis: "time",
                value: alpha,
            });
        }
        debug_assert!(false, "时间插值分数越界: α = {}", alpha);
        warn!(alpha, t_last, t_next, "时间插值分数越界，已钳位");
        return Ok(alpha.clamp(0.0, 1.0));
    }
    Ok(alpha)
}

/// 线性混合 `(1-α)·a + α·b`
#[inline]
pub fn linear_blend(a: f64, b: f64, alpha: f64) -> f64 {
    a + alpha * (b - a)
}

/// σ 层中心括号
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerBracket {
    /// 上层索引
    pub k_upper: usize,
    /// 下层索引
    pub k_lower: usize,
    /// 混合权重（0 取上层，1 取下层）
    pub beta: f64,
    /// z 越出最外层中心，值被钳位
    pub in_boundary: bool,
}

/// 定位界面括号：`levels(k) ≥ z ≥ levels(k+1)`
///
/// `levels` 沿 k 单调递减（自表向底）。z 越出两端时钳位到端部
/// 区间。返回 `(k, β)`。
pub fn locate_level_bracket(levels: impl Fn(usize) -> f64, n_levels: usize, z: f64) -> (usize, f64) {
    debug_assert!(n_levels >= 2);
    if z >= levels(0) {
        return (0, 0.0);
    }
    let last = n_levels - 2;
    for k in 0..=last {
        let upper = levels(k);
        let lower = levels(k + 1);
        if z >= lower {
            let span = upper - lower;
            let beta = if span.abs() < 1e-300 {
                0.0
            } else {
                (upper - z) / span
            };
            return (k, beta.clamp(0.0, 1.0));
        }
    }
    (last, 1.0)
}

/// 定位层中心括号
///
/// z 高于第 0 层中心或低于第 n-1 层中心时，钳位到最外层并标记
/// `in_boundary`（调用方据此设置垂向边界层标志）。
pub fn locate_layer_bracket(layers: impl Fn(usize) -> f64, n_layers: usize, z: f64) -> LayerBracket {
    debug_assert!(n_layers >= 1);
    if z >= layers(0) {
        return LayerBracket {
            k_upper: 0,
            k_lower: 0,
            beta: 0.0,
            in_boundary: true,
        };
    }
    if z <= layers(n_layers - 1) {
        return LayerBracket {
            k_upper: n_layers - 1,
            k_lower: n_layers - 1,
            beta: 0.0,
            in_boundary: true,
        };
    }
    for k in 0..n_layers - 1 {
        let upper = layers(k);
        let lower = layers(k + 1);
        if z >= lower {
            let span = upper - lower;
            let beta = if span.abs() < 1e-300 {
                0.0
            } else {
                (upper - z) / span
            };
            return LayerBracket {
                k_upper: k,
                k_lower: k + 1,
                beta: beta.clamp(0.0, 1.0),
                in_boundary: false,
            };
        }
    }
    LayerBracket {
        k_upper: n_layers - 1,
        k_lower: n_layers - 1,
        beta: 0.0,
        in_boundary: true,
    }
}

/// σ 括号内线性混合
#[inline]
pub fn blend_bracket(upper: f64, lower: f64, beta: f64) -> f64 {
    upper + beta * (lower - upper)
}

/// 单元中心矢量分量的 LLS 水平插值
///
/// `values[0]` 为宿主单元值，`values[1..4]` 为三个邻居值。
/// 含边界边的单元由调用方旁路（直接取宿主中心值），此处假定
/// 四个值全部有效。
pub fn lls_interp(
    a1u: &Array2<f64>,
    a2u: &Array2<f64>,
    elem: usize,
    centroid: DVec2,
    x: f64,
    y: f64,
    values: &[f64; 4],
) -> f64 {
    let mut dudx = 0.0;
    let mut dudy = 0.0;
    for j in 0..4 {
        dudx += values[j] * a1u[(j, elem)];
        dudy += values[j] * a2u[(j, elem)];
    }
    values[0] + dudx * (x - centroid.x) + dudy * (y - centroid.y)
}

/// Shepard 反距离加权插值（幂 p = 2）
///
/// LLS 系数不可用时的回退路径。查询点与某中心重合（距离小于
/// 容差）时直接返回该中心值。
pub fn shepard_interp(centroids: &[DVec2], values: &[f64], x: f64, y: f64) -> f64 {
    debug_assert_eq!(centroids.len(), values.len());
    debug_assert!(!centroids.is_empty());

    let p = DVec2::new(x, y);
    let mut weight_sum = 0.0;
    let mut value_sum = 0.0;
    for (c, &v) in centroids.iter().zip(values.iter()) {
        let d2 = c.distance_squared(p);
        if d2 < 1e-20 {
            return v;
        }
        let w = 1.0 / d2;
        weight_sum += w;
        value_sum += w * v;
    }
    value_sum / weight_sum
}

/// 节点标量场在单元内的闭式梯度 `Σ f_i ∇φ_i`
///
/// 线性基函数梯度随单元为常数，梯度不依赖查询点位置。
pub fn nodal_gradient(mesh: &TriMesh, elem: usize, values: &[f64; 3]) -> DVec2 {
    let grads = mesh.basis_gradients(elem);
    let mut g = DVec2::ZERO;
    for i in 0..3 {
        g += values[i] * grads[i];
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_interp_in_triangle_partition_of_unity() {
        let phi = [0.2, 0.3, 0.5];
        let v = interp_in_triangle(&[7.0, 7.0, 7.0], &phi);
        assert!((v - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_fraction_in_range() {
        let alpha = time_fraction(5.0, 0.0, 10.0, true).unwrap();
        assert!((alpha - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_time_fraction_strict_rejects() {
        assert!(time_fraction(11.0, 0.0, 10.0, true).is_err());
    }

    // 钳位路径只存在于 release 构建（debug 构建直接断言失败）
    #[test]
    #[cfg(not(debug_assertions))]
    fn test_time_fraction_lenient_clamps() {
        let alpha = time_fraction(11.0, 0.0, 10.0, false).unwrap();
        assert!((alpha - 1.0).abs() < 1e-12);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "时间插值分数越界")]
    fn test_time_fraction_lenient_asserts_in_debug() {
        let _ = time_fraction(11.0, 0.0, 10.0, false);
    }

    #[test]
    fn test_level_bracket_interior() {
        // 界面 0, -0.25, -0.5, -0.75, -1
        let levels = |k: usize| -(k as f64) * 0.25;
        let (k, beta) = locate_level_bracket(levels, 5, -0.3);
        assert_eq!(k, 1);
        assert!((beta - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_level_bracket_clamps_ends() {
        let levels = |k: usize| -(k as f64) * 0.25;
        assert_eq!(locate_level_bracket(levels, 5, 0.5), (0, 0.0));
        let (k, beta) = locate_level_bracket(levels, 5, -2.0);
        assert_eq!(k, 3);
        assert!((beta - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_layer_bracket_boundary_flags() {
        // 层中心 -0.1, -0.3, -0.5, -0.7, -0.9
        let layers = |k: usize| -0.1 - 0.2 * k as f64;
        let top = locate_layer_bracket(layers, 5, -0.05);
        assert!(top.in_boundary);
        assert_eq!(top.k_upper, 0);

        let bottom = locate_layer_bracket(layers, 5, -0.95);
        assert!(bottom.in_boundary);
        assert_eq!(bottom.k_lower, 4);

        let mid = locate_layer_bracket(layers, 5, -0.4);
        assert!(!mid.in_boundary);
        assert_eq!((mid.k_upper, mid.k_lower), (1, 2));
        assert!((mid.beta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_lls_reproduces_linear_field() {
        // 人工系数: 设计 a1u/a2u 使加权和给出梯度 (3, 4)，
        // 场分布 u = 2 + 3(x-xc) + 4(y-yc)
        let a1u = arr2(&[[0.0], [1.0], [0.0], [0.0]]);
        let a2u = arr2(&[[0.0], [0.0], [1.0], [0.0]]);
        let values = [2.0, 3.0, 4.0, 0.0];
        let c = DVec2::new(10.0, 20.0);
        let v = lls_interp(&a1u, &a2u, 0, c, 10.5, 20.25, &values);
        assert!((v - (2.0 + 3.0 * 0.5 + 4.0 * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_shepard_exact_at_station() {
        let centroids = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)];
        let values = vec![3.0, 9.0];
        let v = shepard_interp(&centroids, &values, 0.0, 0.0);
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_shepard_midpoint_average() {
        let centroids = vec![DVec2::new(0.0, 0.0), DVec2::new(2.0, 0.0)];
        let values = vec![1.0, 5.0];
        let v = shepard_interp(&centroids, &values, 1.0, 0.0);
        assert!((v - 3.0).abs() < 1e-12);
    }
}
