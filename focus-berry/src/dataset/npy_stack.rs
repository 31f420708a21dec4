//! 以 npy 文件保存在磁盘上的 z-stack 数据集.
//!
//! 目录结构:
//!
//! ```text
//! <root>/
//!   meta.bin        宽, 高, z 间距, 各视野切片数 (bincode)
//!   pos0.npy        第 0 个视野, 形状 (z, h, w), f32
//!   pos1.npy
//!   ...
//!   annotations/    焦平面、设计矩阵等持久化结果
//! ```

use super::{check_position, check_slice, AnnotationStore, FocusDataset};
use crate::{FocusError, FocusResult};
use ndarray::{Array2, Array3, ArrayD, ArrayViewD, Axis};
use ndarray_npy::{read_npy, write_npy};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const META_FILE: &str = "meta.bin";
const ANNOTATION_DIR: &str = "annotations";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StackMeta {
    width: usize,
    height: usize,
    pixel_size_z_um: f64,
    slices: Vec<usize>,
}

/// 磁盘 z-stack 数据集. 每个视野的 stack 在首次访问时加载并缓存.
#[derive(Debug)]
pub struct NpyStackDataset {
    root: PathBuf,
    meta: StackMeta,
    stacks: Vec<OnceCell<Array3<f32>>>,
    annotations: AnnotationStore,
}

#[inline]
fn stack_path(root: &Path, position_index: usize) -> PathBuf {
    root.join(format!("pos{position_index}.npy"))
}

impl NpyStackDataset {
    /// 在 `root` 下新建数据集. `stacks[i]` 是第 `i` 个视野形状为 `(z, h, w)` 的 z-stack.
    ///
    /// 所有视野的图像尺寸必须相同, 否则返回 `Err(FocusError::ShapeMismatch)`.
    pub fn create<P: AsRef<Path>>(
        root: P,
        pixel_size_z_um: f64,
        stacks: &[Array3<f32>],
    ) -> FocusResult<Self> {
        let root = root.as_ref();
        let (height, width) = stacks.first().map_or((0, 0), |s| (s.dim().1, s.dim().2));
        for s in stacks {
            let (_, h, w) = s.dim();
            if h != height {
                return Err(FocusError::ShapeMismatch {
                    what: "stack height",
                    expected: height,
                    found: h,
                });
            }
            if w != width {
                return Err(FocusError::ShapeMismatch {
                    what: "stack width",
                    expected: width,
                    found: w,
                });
            }
        }

        fs::create_dir_all(root)?;
        for (i, s) in stacks.iter().enumerate() {
            write_npy(stack_path(root, i), s)?;
        }

        let meta = StackMeta {
            width,
            height,
            pixel_size_z_um,
            slices: stacks.iter().map(|s| s.len_of(Axis(0))).collect(),
        };
        let mut w = BufWriter::new(File::create(root.join(META_FILE))?);
        bincode::serialize_into(&mut w, &meta)?;
        w.flush()?;
        drop(w);

        Self::open(root)
    }

    /// 打开 `root` 下已有的数据集.
    pub fn open<P: AsRef<Path>>(root: P) -> FocusResult<Self> {
        let root = root.as_ref().to_owned();
        let meta: StackMeta =
            bincode::deserialize_from(BufReader::new(File::open(root.join(META_FILE))?))?;
        let annotations = AnnotationStore::open(root.join(ANNOTATION_DIR))?;
        let stacks = (0..meta.slices.len()).map(|_| OnceCell::new()).collect();
        Ok(Self {
            root,
            meta,
            stacks,
            annotations,
        })
    }

    /// 数据集目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stack(&self, position_index: usize) -> FocusResult<&Array3<f32>> {
        check_position(position_index, self.stacks.len())?;
        self.stacks[position_index].get_or_try_init(|| {
            let data: Array3<f32> = read_npy(stack_path(&self.root, position_index))?;
            let expected = (
                self.meta.slices[position_index],
                self.meta.height,
                self.meta.width,
            );
            if data.dim() != expected {
                return Err(FocusError::ShapeMismatch {
                    what: "stack voxel count",
                    expected: expected.0 * expected.1 * expected.2,
                    found: data.len(),
                });
            }
            Ok(data)
        })
    }
}

impl FocusDataset for NpyStackDataset {
    #[inline]
    fn image_width(&self) -> usize {
        self.meta.width
    }

    #[inline]
    fn image_height(&self) -> usize {
        self.meta.height
    }

    #[inline]
    fn pixel_size_z_um(&self) -> f64 {
        self.meta.pixel_size_z_um
    }

    #[inline]
    fn num_positions(&self) -> usize {
        self.meta.slices.len()
    }

    fn num_z_slices_at(&self, position_index: usize) -> FocusResult<usize> {
        check_position(position_index, self.meta.slices.len())?;
        Ok(self.meta.slices[position_index])
    }

    fn read_image(&self, position_index: usize, z_index: usize) -> FocusResult<Array2<f32>> {
        let stack = self.stack(position_index)?;
        check_slice(z_index, stack.len_of(Axis(0)))?;
        Ok(stack.index_axis(Axis(0), z_index).to_owned())
    }

    fn read_scalar(&self, name: &str) -> FocusResult<Option<f64>> {
        Ok(self.annotations.read_scalar(name))
    }

    fn store_scalar(&mut self, name: &str, value: f64) -> FocusResult<()> {
        self.annotations.store_scalar(name, value)
    }

    fn read_array(&self, name: &str) -> FocusResult<Option<ArrayD<f32>>> {
        self.annotations.read_array(name)
    }

    fn store_array(&mut self, name: &str, array: ArrayViewD<f32>) -> FocusResult<()> {
        self.annotations.store_array(name, array)
    }
}
