//! patch 几何.
//!
//! 将传感器原始图像切分为若干边长为 2 的幂的正方形 patch, 按行优先排列.

use crate::{FocusError, FocusResult, Idx2d};
use ndarray::{s, ArrayView2};

/// 单张图像的 patch 切分方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PatchGeometry {
    patch_size: usize,
    tiles_per_side: usize,
}

impl PatchGeometry {
    /// 从图像宽 `width`, 高 `height` 和每个方向的切分数 `split_k` 计算 patch 几何.
    ///
    /// 记 `shape = min(width, height)`, 则 patch 边长为不超过 `shape / split_k`
    /// 的最大 2 的幂, 每张图像的 patch 数为 `(shape / patch_size)^2`.
    ///
    /// `split_k` 为 0 或大于 `shape` 时返回 `Err(FocusError::InvalidSplit)`.
    pub fn new(width: usize, height: usize, split_k: u32) -> FocusResult<Self> {
        let shape = width.min(height);
        if split_k == 0 {
            return Err(FocusError::InvalidSplit(split_k));
        }
        let quota = shape / split_k as usize;
        if quota == 0 {
            return Err(FocusError::InvalidSplit(split_k));
        }

        // floor(log2(shape / k)) 与 floor(log2(floor(shape / k))) 相同.
        let patch_size = 1_usize << quota.ilog2();
        Ok(Self {
            patch_size,
            tiles_per_side: shape / patch_size,
        })
    }

    /// patch 边长 (像素).
    #[inline]
    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// 每个方向上的 patch 个数.
    #[inline]
    pub fn tiles_per_side(&self) -> usize {
        self.tiles_per_side
    }

    /// 每张图像的 patch 个数.
    #[inline]
    pub fn patches_per_image(&self) -> usize {
        self.tiles_per_side * self.tiles_per_side
    }

    /// patch 的形状 `(h, w)`.
    #[inline]
    pub fn patch_shape(&self) -> Idx2d {
        (self.patch_size, self.patch_size)
    }

    /// 第 `patch_index` 个 patch 左上角的像素坐标 `(h, w)`.
    pub fn tile_origin(&self, patch_index: usize) -> FocusResult<Idx2d> {
        let len = self.patches_per_image();
        if patch_index >= len {
            return Err(FocusError::IndexOutOfRange {
                what: "patch",
                index: patch_index,
                len,
            });
        }
        let row = patch_index / self.tiles_per_side;
        let col = patch_index % self.tiles_per_side;
        Ok((row * self.patch_size, col * self.patch_size))
    }

    /// 从 `image` 中裁出第 `patch_index` 个 patch (零拷贝).
    pub fn crop<'a>(
        &self,
        image: ArrayView2<'a, f32>,
        patch_index: usize,
    ) -> FocusResult<ArrayView2<'a, f32>> {
        let (h0, w0) = self.tile_origin(patch_index)?;
        let (h, w) = image.dim();
        let p = self.patch_size;
        if h0 + p > h {
            return Err(FocusError::ShapeMismatch {
                what: "image height",
                expected: h0 + p,
                found: h,
            });
        }
        if w0 + p > w {
            return Err(FocusError::ShapeMismatch {
                what: "image width",
                expected: w0 + p,
                found: w,
            });
        }
        Ok(image.slice_move(s![h0..h0 + p, w0..w0 + p]))
    }
}

/// 计算 `(patch 边长, 每张图像的 patch 数)`.
#[inline]
pub fn patch_metadata(width: usize, height: usize, split_k: u32) -> FocusResult<Idx2d> {
    let g = PatchGeometry::new(width, height, split_k)?;
    Ok((g.patch_size(), g.patches_per_image()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_patch_metadata_examples() {
        assert_eq!(patch_metadata(2048, 2048, 1).unwrap(), (2048, 1));
        assert_eq!(patch_metadata(2048, 2048, 2).unwrap(), (1024, 4));
        assert_eq!(patch_metadata(1000, 800, 2).unwrap(), (256, 9));
        assert_eq!(patch_metadata(100, 130, 3).unwrap(), (32, 9));
        // split_k = 1 给出能放进图像的最大 2 的幂正方形.
        assert_eq!(patch_metadata(600, 700, 1).unwrap(), (512, 1));
    }

    #[test]
    fn test_patch_size_is_power_of_two_and_fits() {
        for width in (1..300).step_by(7) {
            for height in (1..300).step_by(11) {
                let shape = width.min(height);
                for k in 1..=shape.min(9) as u32 {
                    let g = PatchGeometry::new(width, height, k).unwrap();
                    let p = g.patch_size();
                    assert!(p.is_power_of_two());
                    assert!(p * (shape / p) <= shape);
                    assert!(g.tiles_per_side() >= k as usize);
                }
            }
        }
    }

    #[test]
    fn test_invalid_split() {
        assert!(matches!(
            PatchGeometry::new(64, 64, 0),
            Err(FocusError::InvalidSplit(0))
        ));
        assert!(matches!(
            PatchGeometry::new(4, 64, 5),
            Err(FocusError::InvalidSplit(5))
        ));
    }

    #[test]
    fn test_crop_row_major() {
        let image = Array2::from_shape_fn((8, 8), |(h, w)| (h * 8 + w) as f32);
        let g = PatchGeometry::new(8, 8, 2).unwrap();
        assert_eq!(g.patches_per_image(), 4);

        assert_eq!(g.tile_origin(1).unwrap(), (0, 4));
        assert_eq!(g.tile_origin(2).unwrap(), (4, 0));

        let p3 = g.crop(image.view(), 3).unwrap();
        assert_eq!(p3.dim(), (4, 4));
        assert_eq!(p3[(0, 0)], 36.0);
        assert!(g.crop(image.view(), 4).is_err());
    }
}
