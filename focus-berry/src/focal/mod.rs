//! 焦平面估计.
//!
//! 对一个视野的 z-stack, 求每层径向功率谱的高频部分之和作为清晰度分数,
//! 用三次样条插值后稠密重采样, 取最大值处作为亚步长精度的焦平面.

mod cache;

pub use cache::{read_or_calc_focal_plane, read_or_calc_focal_planes};

use crate::consts::{HIGH_FREQ_DIVISOR, INTERP_POINTS, MIN_Z_SLICES};
use crate::dataset::FocusDataset;
use crate::fitting;
use crate::pool::{map_maybe_parallel, WorkerPool};
use crate::spectrum::spectral_sharpness;
use crate::{FocusError, FocusResult, PatchGeometry};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use ordered_float::NotNan;
use std::collections::BTreeMap;

/// 单个视野内, patch 索引到焦平面 z 位置 (微米) 的映射.
///
/// 目前每个视野只估计一个全局焦平面, 所有 patch 的值相同.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchFocalPlanes(Vec<f64>);

impl PatchFocalPlanes {
    /// 所有 `patches` 个 patch 共用焦平面 `z_um`.
    #[inline]
    pub fn uniform(z_um: f64, patches: usize) -> Self {
        Self(vec![z_um; patches])
    }

    /// 第 `patch_index` 个 patch 的焦平面.
    #[inline]
    pub fn get(&self, patch_index: usize) -> Option<f64> {
        self.0.get(patch_index).copied()
    }

    /// patch 个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否没有任何 patch.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按 patch 索引顺序迭代焦平面.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

/// 一个数据集的焦平面表: 视野索引 -> [`PatchFocalPlanes`].
pub type FocalPlanes = BTreeMap<usize, PatchFocalPlanes>;

/// 由按 z 顺序排列的各层径向功率谱求焦平面, 单位与 `z_step_um` 相同.
///
/// 至少需要 [`MIN_Z_SLICES`] 层, 且各层谱长度一致.
pub fn solve_focal_plane(profiles: &[Array1<f64>], z_step_um: f64) -> FocusResult<f64> {
    let n = profiles.len();
    if n < MIN_Z_SLICES {
        return Err(FocusError::TooFewSlices {
            found: n,
            required: MIN_Z_SLICES,
        });
    }
    let bins = profiles[0].len();
    let stacked = stack_profiles(profiles, bins)?;

    let scores = stacked
        .slice(s![.., bins / HIGH_FREQ_DIVISOR..])
        .sum_axis(Axis(1));
    let index = Array1::from_iter((0..n).map(|i| i as f64));
    let (xx, yy) = fitting::cubic_resample(index.view(), scores.view(), INTERP_POINTS)?;

    let best = argmax_first(yy.iter().copied())?;
    Ok(xx[best] * z_step_um)
}

/// 将各层谱堆叠成 `(slices, bins)` 的二维数组.
fn stack_profiles(profiles: &[Array1<f64>], bins: usize) -> FocusResult<Array2<f64>> {
    let mut stacked = Array2::<f64>::zeros((profiles.len(), bins));
    for (mut row, p) in stacked.axis_iter_mut(Axis(0)).zip(profiles) {
        if p.len() != bins {
            return Err(FocusError::ShapeMismatch {
                what: "radial profile length",
                expected: bins,
                found: p.len(),
            });
        }
        row.assign(p);
    }
    Ok(stacked)
}

/// 第一个最大值的下标. 出现 NaN 时返回错误.
fn argmax_first<I: Iterator<Item = f64>>(it: I) -> FocusResult<usize> {
    let mut best: Option<(usize, NotNan<f64>)> = None;
    for (i, v) in it.enumerate() {
        let v = NotNan::new(v).map_err(|_| FocusError::NonFiniteScore)?;
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i).ok_or(FocusError::NonFiniteScore)
}

/// 计算第 `position_index` 个视野的焦平面 (微米).
///
/// 每层只取左上角第一个 patch (边长为 2 的幂) 计算径向功率谱.
/// 给定 `pool` 时各层的功率谱并行计算, 结果按 z 顺序重新排列后再求解,
/// 因此与串行执行的结果完全一致.
pub fn calc_focal_plane<D: FocusDataset + ?Sized>(
    data: &D,
    position_index: usize,
    split_k: u32,
    pool: Option<&WorkerPool>,
) -> FocusResult<f64> {
    log::info!(
        "Calculating focal plane, position {} of {}",
        position_index,
        data.num_positions()
    );

    let geometry = PatchGeometry::new(data.image_width(), data.image_height(), split_k)?;
    let num_slices = data.num_z_slices_at(position_index)?;
    if num_slices < MIN_Z_SLICES {
        return Err(FocusError::TooFewSlices {
            found: num_slices,
            required: MIN_Z_SLICES,
        });
    }

    let images = (0..num_slices)
        .map(|z| data.read_image(position_index, z))
        .collect::<FocusResult<Vec<_>>>()?;
    let tiles = images
        .iter()
        .map(|img| geometry.crop(img.view(), 0))
        .collect::<FocusResult<Vec<ArrayView2<f32>>>>()?;

    let profiles = map_maybe_parallel(pool, &tiles, |t| spectral_sharpness(t.view()));
    let focal_plane = solve_focal_plane(&profiles, data.pixel_size_z_um())?;
    log::info!("focal plane: {focal_plane}");
    Ok(focal_plane)
}
