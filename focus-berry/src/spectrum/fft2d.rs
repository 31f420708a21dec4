//! 二维 FFT 及零频居中.

use ndarray::{Array2, ArrayView2, Axis};
use num::complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// 对实数图像做二维正向 FFT: 先逐行, 再逐列.
pub(crate) fn fft2(image: ArrayView2<f32>) -> Array2<Complex64> {
    let (h, w) = image.dim();
    let mut buf = image.mapv(|v| Complex64::new(v as f64, 0.0));
    if h == 0 || w == 0 {
        return buf;
    }

    let mut planner = FftPlanner::<f64>::new();
    transform_lanes(&mut buf, Axis(0), planner.plan_fft_forward(w).as_ref());
    transform_lanes(&mut buf, Axis(1), planner.plan_fft_forward(h).as_ref());
    buf
}

/// 对 `buf` 中沿 `axis` 迭代得到的每条一维 lane 原地做 FFT.
///
/// 经过暂存缓冲区拷贝, 因此不依赖数组的内存布局.
fn transform_lanes(buf: &mut Array2<Complex64>, axis: Axis, fft: &dyn Fft<f64>) {
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft.len()];
    for mut lane in buf.axis_iter_mut(axis) {
        scratch.iter_mut().zip(lane.iter()).for_each(|(d, s)| *d = *s);
        fft.process(&mut scratch);
        lane.iter_mut().zip(scratch.iter()).for_each(|(d, s)| *d = *s);
    }
}

/// 将零频分量移到中心 `(h / 2, w / 2)`, 与常见的 `fftshift` 语义一致.
pub(crate) fn fftshift<T: Copy>(arr: &Array2<T>) -> Array2<T> {
    let (h, w) = arr.dim();
    let (dh, dw) = (h / 2, w / 2);
    Array2::from_shape_fn((h, w), |(i, j)| {
        arr[((i + h - dh) % h, (j + w - dw) % w)]
    })
}
