//! 数据集操作.
//!
//! [`FocusDataset`] 抽象了 z-stack 的读取和按名称持久化的标量/数组存储.
//! 本模块提供两个实现: 基于磁盘 npy 文件的 [`NpyStackDataset`] 与纯内存的
//! [`MemoryDataset`].

use crate::{FocusError, FocusResult, PatchGeometry};
use ndarray::{Array2, ArrayD, ArrayViewD};
use std::path::{Path, PathBuf};

mod annotation;
mod memory;
mod npy_stack;

pub use annotation::AnnotationStore;
pub use memory::MemoryDataset;
pub use npy_stack::NpyStackDataset;

/// 多视野 z-stack 数据集.
///
/// 读取操作只需要 `&self`; 持久化写入需要 `&mut self`, 因此同一时刻只能有一个写者.
pub trait FocusDataset {
    /// 图像宽度 (像素).
    fn image_width(&self) -> usize;

    /// 图像高度 (像素).
    fn image_height(&self) -> usize;

    /// 相邻 z 切片的间距, 以微米为单位.
    fn pixel_size_z_um(&self) -> f64;

    /// 视野 (XY position) 个数.
    fn num_positions(&self) -> usize;

    /// 第 `position_index` 个视野的 z 切片个数.
    fn num_z_slices_at(&self, position_index: usize) -> FocusResult<usize>;

    /// 读取第 `position_index` 个视野第 `z_index` 层的原始图像, 形状为 `(h, w)`.
    fn read_image(&self, position_index: usize, z_index: usize) -> FocusResult<Array2<f32>>;

    /// 读取用于预测的 patch: 按 `split_k` 切分后的第 `patch_index` 块.
    ///
    /// 默认实现读取整幅图像后按 [`PatchGeometry`] 裁剪.
    fn read_patch(
        &self,
        position_index: usize,
        z_index: usize,
        split_k: u32,
        patch_index: usize,
    ) -> FocusResult<Array2<f32>> {
        let geometry = PatchGeometry::new(self.image_width(), self.image_height(), split_k)?;
        let image = self.read_image(position_index, z_index)?;
        Ok(geometry.crop(image.view(), patch_index)?.to_owned())
    }

    /// 读取名为 `name` 的标量. 不存在时返回 `Ok(None)`.
    fn read_scalar(&self, name: &str) -> FocusResult<Option<f64>>;

    /// 保存名为 `name` 的标量, 已存在时覆盖.
    fn store_scalar(&mut self, name: &str, value: f64) -> FocusResult<()>;

    /// 读取名为 `name` 的数组. 不存在时返回 `Ok(None)`.
    fn read_array(&self, name: &str) -> FocusResult<Option<ArrayD<f32>>>;

    /// 保存名为 `name` 的数组, 已存在时覆盖.
    fn store_array(&mut self, name: &str, array: ArrayViewD<f32>) -> FocusResult<()>;
}

/// 检查视野索引是否合法.
#[inline]
pub(crate) fn check_position(index: usize, len: usize) -> FocusResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(FocusError::IndexOutOfRange {
            what: "position",
            index,
            len,
        })
    }
}

/// 检查 z 切片索引是否合法.
#[inline]
pub(crate) fn check_slice(index: usize, len: usize) -> FocusResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(FocusError::IndexOutOfRange {
            what: "z slice",
            index,
            len,
        })
    }
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
