//! (patch, 离焦距离) 训练对生成.
//!
//! [`TrainingPairs`] 是一个可重复消费的惰性序列: 每次调用 [`TrainingPairs::iter`]
//! 都从头产生完全相同的序列, 各次迭代之间不共享任何可变状态.

use crate::dataset::FocusDataset;
use crate::focal::FocalPlanes;
use crate::{FocusError, FocusResult, Idx2d, PatchGeometry};
use itertools::Itertools;
use ndarray::Array2;

/// 一个数据集, 及其参与训练的视野与焦平面表.
#[derive(Debug)]
pub struct PairSource<'a, D: ?Sized> {
    /// 数据集.
    pub data: &'a D,
    /// 使用的视野索引, 按此顺序产生训练对.
    pub positions: &'a [usize],
    /// 该数据集的焦平面表.
    pub focal_planes: &'a FocalPlanes,
}

impl<D: ?Sized> Clone for PairSource<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: ?Sized> Copy for PairSource<'_, D> {}

/// 一个训练样本.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    /// 图像 patch.
    pub patch: Array2<f32>,
    /// 有符号离焦距离 = 焦平面位置 - z 间距 × 切片索引, 单位与 z 间距相同.
    pub defocus_dist: f64,
}

/// (数据源下标, z 切片索引, 视野索引).
type SlicePos = (usize, usize, usize);

/// 跨数据集/视野/切片/patch 的训练对序列.
#[derive(Debug)]
pub struct TrainingPairs<'a, D: ?Sized> {
    sources: Vec<PairSource<'a, D>>,
    geometries: Vec<PatchGeometry>,
    tuples: Vec<SlicePos>,
    split_k: u32,
}

impl<'a, D: FocusDataset + ?Sized> TrainingPairs<'a, D> {
    /// 构建序列.
    ///
    /// 先按数据源顺序、再按视野顺序、最后按 z 顺序展开 (数据集, 切片, 视野) 组合;
    /// `ignore_first_slice` 为真时跳过每个视野的第 0 层.
    /// 每个组合再按 patch 索引依次产生训练对.
    ///
    /// 视野索引越界或焦平面表缺失条目时立即返回错误.
    pub fn new(
        sources: Vec<PairSource<'a, D>>,
        tile_split_k: u32,
        ignore_first_slice: bool,
    ) -> FocusResult<Self> {
        let mut geometries = Vec::with_capacity(sources.len());
        let mut tuples = Vec::new();

        for (src_idx, src) in sources.iter().enumerate() {
            let geometry =
                PatchGeometry::new(src.data.image_width(), src.data.image_height(), tile_split_k)?;
            for &pos in src.positions {
                let planes = src.focal_planes.get(&pos).ok_or(FocusError::IndexOutOfRange {
                    what: "focal plane position",
                    index: pos,
                    len: src.focal_planes.len(),
                })?;
                if planes.len() < geometry.patches_per_image() {
                    return Err(FocusError::ShapeMismatch {
                        what: "focal planes per position",
                        expected: geometry.patches_per_image(),
                        found: planes.len(),
                    });
                }

                let first = usize::from(ignore_first_slice);
                let slices = src.data.num_z_slices_at(pos)?;
                tuples.extend((first..slices).map(|z| (src_idx, z, pos)));
            }
            geometries.push(geometry);
        }
        log::info!("{} slice-position tuples", tuples.len());

        Ok(Self {
            sources,
            geometries,
            tuples,
            split_k: tile_split_k,
        })
    }

    /// 训练对总数.
    pub fn len(&self) -> usize {
        self.tuples
            .iter()
            .map(|&(src, _, _)| self.geometries[src].patches_per_image())
            .sum()
    }

    /// 序列是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// patch 形状. 多个数据源的 patch 形状不一致或没有数据源时返回 `None`.
    pub fn patch_shape(&self) -> Option<Idx2d> {
        self.geometries
            .iter()
            .map(PatchGeometry::patch_shape)
            .dedup()
            .exactly_one()
            .ok()
    }

    /// 从头开始迭代.
    #[inline]
    pub fn iter(&self) -> PairIter<'_, 'a, D> {
        PairIter {
            pairs: self,
            tuple: 0,
            patch: 0,
            remaining: self.len(),
        }
    }

    fn pair_at(&self, (src_idx, z, pos): SlicePos, patch_index: usize) -> FocusResult<TrainingPair> {
        let src = &self.sources[src_idx];
        let patch = src.data.read_patch(pos, z, self.split_k, patch_index)?;
        let focal_plane = src
            .focal_planes
            .get(&pos)
            .and_then(|p| p.get(patch_index))
            .ok_or(FocusError::IndexOutOfRange {
                what: "focal plane patch",
                index: patch_index,
                len: src.focal_planes.get(&pos).map_or(0, |p| p.len()),
            })?;
        Ok(TrainingPair {
            patch,
            defocus_dist: focal_plane - src.data.pixel_size_z_um() * z as f64,
        })
    }
}

impl<'p, 'a, D: FocusDataset + ?Sized> IntoIterator for &'p TrainingPairs<'a, D> {
    type Item = FocusResult<TrainingPair>;
    type IntoIter = PairIter<'p, 'a, D>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// [`TrainingPairs`] 的一次遍历.
#[derive(Debug)]
pub struct PairIter<'p, 'a, D: ?Sized> {
    pairs: &'p TrainingPairs<'a, D>,
    tuple: usize,
    patch: usize,
    remaining: usize,
}

impl<D: FocusDataset + ?Sized> Iterator for PairIter<'_, '_, D> {
    type Item = FocusResult<TrainingPair>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let t = *self.pairs.tuples.get(self.tuple)?;
            if self.patch >= self.pairs.geometries[t.0].patches_per_image() {
                self.tuple += 1;
                self.patch = 0;
                continue;
            }
            let ans = self.pairs.pair_at(t, self.patch);
            self.patch += 1;
            self.remaining -= 1;
            return Some(ans);
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<D: FocusDataset + ?Sized> ExactSizeIterator for PairIter<'_, '_, D> {}
