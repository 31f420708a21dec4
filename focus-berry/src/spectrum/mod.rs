//! 频域清晰度估计.
//!
//! 单张 z 切片的清晰度签名为其径向平均对数功率谱: 离焦越少, 高频部分越强.

mod fft2d;

use crate::consts::POWER_FLOOR;
use ndarray::{Array1, Array2, ArrayView2};

/// 计算图像的径向平均对数功率谱.
///
/// 1. 二维 FFT, 并将零频移到中心;
/// 2. 功率 = 变换值 × 其共轭;
/// 3. 取自然对数. 功率为 0 的频点用 [`POWER_FLOOR`] 代替, 不会得到 `-inf`;
/// 4. 以中心为圆心, 按到中心的整数距离分环求平均.
///
/// 返回长度为 `max(1, min(h, w) / 2)` 的一维谱, 下标为径向距离.
/// 对同一输入, 结果逐位相同.
pub fn spectral_sharpness(image: ArrayView2<f32>) -> Array1<f64> {
    let spectrum = fft2d::fftshift(&fft2d::fft2(image));
    let log_power = spectrum.mapv(|c| (c * c.conj()).re.max(POWER_FLOOR).ln());
    radial_average(&log_power)
}

/// 以 `(h / 2, w / 2)` 为圆心, 对 `arr` 按整数半径分环求平均.
///
/// 只保留完整落在图像内的环, 即半径小于 `min(h, w) / 2` 的部分 (至少保留 0 号环).
pub fn radial_average(arr: &Array2<f64>) -> Array1<f64> {
    let (h, w) = arr.dim();
    let bins = (h.min(w) / 2).max(1);
    let (ch, cw) = ((h / 2) as f64, (w / 2) as f64);

    let mut sum = vec![0.0_f64; bins];
    let mut count = vec![0_usize; bins];
    for ((i, j), &v) in arr.indexed_iter() {
        let r = (i as f64 - ch).hypot(j as f64 - cw) as usize;
        if r < bins {
            sum[r] += v;
            count[r] += 1;
        }
    }

    sum.iter()
        .zip(count.iter())
        .map(|(&s, &n)| if n == 0 { 0.0 } else { s / n as f64 })
        .collect()
}
