//! 曲线拟合.
//!
//! 给定一系列点 `(x, y)`, 该模块可以拟合出一条三次样条曲线并稠密重采样.

mod cubic_spline;

pub use cubic_spline::CubicSpline;

use crate::FocusResult;
use ndarray::{Array1, ArrayView1};

type ArrayPair = (Array1<f64>, Array1<f64>);

/// 拟合 not-a-knot 三次样条, 并在 `[x_0, x_{n-1}]` 上等距采样 `points` 个点.
///
/// `x` 是严格递增的数组 (至少 4 个点), `y` 是对应函数值.
pub fn cubic_resample(x: ArrayView1<f64>, y: ArrayView1<f64>, points: usize) -> FocusResult<ArrayPair> {
    Ok(CubicSpline::not_a_knot(x, y)?.resample(points))
}
