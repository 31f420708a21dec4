//! not-a-knot 三次样条.

use crate::{FocusError, FocusResult};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array, Array1, ArrayView1};

/// 已求解的三次样条插值曲线.
///
/// 以各节点处的二阶导数 (弯矩) `m` 表示. 边界条件为 not-a-knot:
/// 三阶导数在第二个和倒数第二个节点处连续.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Array1<f64>,
    y: Array1<f64>,
    m: Array1<f64>,
}

impl CubicSpline {
    /// 拟合 not-a-knot 三次样条.
    ///
    /// `x` 必须严格递增, 且至少有 4 个点, 否则程序 panic.
    pub fn not_a_knot(x: ArrayView1<f64>, y: ArrayView1<f64>) -> FocusResult<Self> {
        assert_eq!(x.len(), y.len(), "x 值和 y 值必须一一对应");
        assert!(x.len() >= 4, "not-a-knot 样条至少需要四个点");
        assert!(
            x.windows(2).into_iter().all(|v| v[0] < v[1]),
            "x 值必须严格递增"
        );

        let m = Self::moments(x, y)?;
        Ok(Self {
            x: x.to_owned(),
            y: y.to_owned(),
            m,
        })
    }

    fn moments(x: ArrayView1<f64>, y: ArrayView1<f64>) -> FocusResult<Array1<f64>> {
        let n = x.len();
        let h: Vec<f64> = x.windows(2).into_iter().map(|v| v[1] - v[0]).collect();
        let slope: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut r = DVector::<f64>::zeros(n);

        // 首行: x_1 处三阶导连续.
        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];

        for i in 1..(n - 1) {
            a[(i, i - 1)] = h[i - 1];
            a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
            a[(i, i + 1)] = h[i];
            r[i] = 6.0 * (slope[i] - slope[i - 1]);
        }

        // 末行: x_{n-2} 处三阶导连续.
        a[(n - 1, n - 3)] = h[n - 2];
        a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
        a[(n - 1, n - 1)] = h[n - 3];

        let m = a.lu().solve(&r).ok_or(FocusError::SingularSystem)?;
        Ok(Array1::from_iter(m.iter().copied()))
    }

    /// 在 `t` 处求值. 区间外按端点所在的多项式外推.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        // 第一个满足 x[i] > t 的下标, 再退一步得到所在区间.
        let i = self
            .x
            .as_slice()
            .map_or(0, |xs| xs.partition_point(|&v| v <= t))
            .clamp(1, n - 1)
            - 1;

        let h = self.x[i + 1] - self.x[i];
        let d = t - self.x[i];
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let b = (self.y[i + 1] - self.y[i]) / h - h * (2.0 * m0 + m1) / 6.0;
        let c = m0 / 2.0;
        let e = (m1 - m0) / (6.0 * h);
        ((e * d + c) * d + b) * d + self.y[i]
    }

    /// 在节点区间 `[x_0, x_{n-1}]` 上等距采样 `points` 个点 (包括两个端点).
    pub fn resample(&self, points: usize) -> (Array1<f64>, Array1<f64>) {
        let lo = self.x[0];
        let hi = self.x[self.x.len() - 1];
        let xs = Array::linspace(lo, hi, points);
        let ys = xs.mapv(|t| self.eval(t));
        (xs, ys)
    }
}
