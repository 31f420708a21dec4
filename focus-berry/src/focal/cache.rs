//! 焦平面的读取或计算.
//!
//! 每个视野的焦平面以 `pos<i>_focal_plane` 为名保存在数据集中. 已保存时直接复用,
//! 否则计算后保存. 所有写入都在调用线程上完成, 线程池只负责纯计算.

use super::{calc_focal_plane, FocalPlanes, PatchFocalPlanes};
use crate::consts::focal_plane_key;
use crate::dataset::FocusDataset;
use crate::pool::WorkerPool;
use crate::{FocusResult, PatchGeometry};

/// 读取或计算第 `position_index` 个视野的焦平面, 并复制到全部 patch 上.
pub fn read_or_calc_focal_plane<D: FocusDataset + ?Sized>(
    data: &mut D,
    position_index: usize,
    split_k: u32,
    pool: Option<&WorkerPool>,
) -> FocusResult<PatchFocalPlanes> {
    let patches = PatchGeometry::new(data.image_width(), data.image_height(), split_k)?
        .patches_per_image();
    let name = focal_plane_key(position_index);

    let focal_plane = match data.read_scalar(&name)? {
        Some(z) => {
            log::info!("Reading precomputed focal plane: position {position_index}");
            z
        }
        None => {
            let z = calc_focal_plane(&*data, position_index, split_k, pool)?;
            data.store_scalar(&name, z)?;
            z
        }
    };
    Ok(PatchFocalPlanes::uniform(focal_plane, patches))
}

/// 读取或计算数据集中每个视野的焦平面.
///
/// `pool` 为 `None` 时完全串行执行.
pub fn read_or_calc_focal_planes<D: FocusDataset + ?Sized>(
    data: &mut D,
    split_k: u32,
    pool: Option<&WorkerPool>,
) -> FocusResult<FocalPlanes> {
    (0..data.num_positions())
        .map(|pos| read_or_calc_focal_plane(data, pos, split_k, pool).map(|p| (pos, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focal::tests::synthetic_stack;
    use crate::{FocusDataset, FocusError, MemoryDataset, NpyStackDataset};
    use std::num::NonZeroUsize;

    fn two_positions() -> Vec<ndarray::Array3<f32>> {
        vec![synthetic_stack(6, 2, 32), synthetic_stack(6, 4, 32)]
    }

    #[test]
    fn test_computes_then_reuses() {
        let mut data = MemoryDataset::new(1.0, two_positions()).unwrap();
        let first = read_or_calc_focal_planes(&mut data, 2, None).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[&0].len(), 4);
        let z0 = first[&0].get(0).unwrap();
        assert!(first[&0].iter().all(|z| z == z0));
        assert_eq!(data.read_scalar("pos0_focal_plane").unwrap(), Some(z0));

        // 人为修改已保存的值, 第二次调用必须读取而不是重新计算.
        data.store_scalar("pos1_focal_plane", 42.0).unwrap();
        let second = read_or_calc_focal_planes(&mut data, 2, None).unwrap();
        assert_eq!(second[&0], first[&0]);
        assert_eq!(second[&1].get(3), Some(42.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir_seq = tempfile::tempdir().unwrap();
        let dir_par = tempfile::tempdir().unwrap();
        let mut seq = NpyStackDataset::create(dir_seq.path(), 0.75, &two_positions()).unwrap();
        let mut par = NpyStackDataset::create(dir_par.path(), 0.75, &two_positions()).unwrap();

        let pool = WorkerPool::new(NonZeroUsize::new(4).unwrap()).unwrap();
        let a = read_or_calc_focal_planes(&mut seq, 1, None).unwrap();
        let b = read_or_calc_focal_planes(&mut par, 1, Some(&pool)).unwrap();
        assert_eq!(a, b);

        let seq = NpyStackDataset::open(dir_seq.path()).unwrap();
        let par = NpyStackDataset::open(dir_par.path()).unwrap();
        for pos in 0..2 {
            let name = focal_plane_key(pos);
            let x = seq.read_scalar(&name).unwrap().unwrap();
            let y = par.read_scalar(&name).unwrap().unwrap();
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_too_few_slices_propagates() {
        let mut data = MemoryDataset::new(1.0, vec![synthetic_stack(3, 1, 16)]).unwrap();
        assert!(matches!(
            read_or_calc_focal_planes(&mut data, 1, None),
            Err(FocusError::TooFewSlices { found: 3, .. })
        ));
        assert_eq!(data.read_scalar("pos0_focal_plane").unwrap(), None);
    }
}
