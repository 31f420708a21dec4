//! 纯内存数据集.

use super::{check_position, check_slice, FocusDataset};
use crate::{FocusError, FocusResult};
use ndarray::{Array2, Array3, ArrayD, ArrayViewD, Axis};
use std::collections::HashMap;

/// 全部数据都在内存中的 z-stack 数据集. 持久化存储也只在内存中, 随对象销毁.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    width: usize,
    height: usize,
    pixel_size_z_um: f64,
    stacks: Vec<Array3<f32>>,
    scalars: HashMap<String, f64>,
    arrays: HashMap<String, ArrayD<f32>>,
}

impl MemoryDataset {
    /// 由各视野形状为 `(z, h, w)` 的 z-stack 构造.
    ///
    /// 所有视野的图像尺寸必须相同, 否则返回 `Err(FocusError::ShapeMismatch)`.
    pub fn new(pixel_size_z_um: f64, stacks: Vec<Array3<f32>>) -> FocusResult<Self> {
        let (height, width) = stacks.first().map_or((0, 0), |s| (s.dim().1, s.dim().2));
        for s in stacks.iter() {
            let (_, h, w) = s.dim();
            if (h, w) != (height, width) {
                return Err(FocusError::ShapeMismatch {
                    what: "stack pixel count",
                    expected: height * width,
                    found: h * w,
                });
            }
        }
        Ok(Self {
            width,
            height,
            pixel_size_z_um,
            stacks,
            scalars: HashMap::new(),
            arrays: HashMap::new(),
        })
    }
}

impl FocusDataset for MemoryDataset {
    #[inline]
    fn image_width(&self) -> usize {
        self.width
    }

    #[inline]
    fn image_height(&self) -> usize {
        self.height
    }

    #[inline]
    fn pixel_size_z_um(&self) -> f64 {
        self.pixel_size_z_um
    }

    #[inline]
    fn num_positions(&self) -> usize {
        self.stacks.len()
    }

    fn num_z_slices_at(&self, position_index: usize) -> FocusResult<usize> {
        check_position(position_index, self.stacks.len())?;
        Ok(self.stacks[position_index].len_of(Axis(0)))
    }

    fn read_image(&self, position_index: usize, z_index: usize) -> FocusResult<Array2<f32>> {
        check_position(position_index, self.stacks.len())?;
        let stack = &self.stacks[position_index];
        check_slice(z_index, stack.len_of(Axis(0)))?;
        Ok(stack.index_axis(Axis(0), z_index).to_owned())
    }

    fn read_scalar(&self, name: &str) -> FocusResult<Option<f64>> {
        Ok(self.scalars.get(name).copied())
    }

    fn store_scalar(&mut self, name: &str, value: f64) -> FocusResult<()> {
        self.scalars.insert(name.to_owned(), value);
        Ok(())
    }

    fn read_array(&self, name: &str) -> FocusResult<Option<ArrayD<f32>>> {
        Ok(self.arrays.get(name).cloned())
    }

    fn store_array(&mut self, name: &str, array: ArrayViewD<f32>) -> FocusResult<()> {
        self.arrays.insert(name.to_owned(), array.to_owned());
        Ok(())
    }
}
