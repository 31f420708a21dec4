#![warn(missing_docs)]

//! 核心库. 为显微镜离焦距离回归网络准备训练数据.
//!
//! 数据流: 原始 z-stack -> 频域清晰度 (径向平均对数功率谱) -> 焦平面估计
//! -> 焦平面缓存 -> (patch, 离焦距离) 训练对 -> 确定性特征缓存 -> 合并后的特征/目标数组.
//!
//! # 注意
//!
//! 1. 每个视野 (position) 只估计一个全局焦平面, 所有 patch 共用该值.
//!   数据模型按 patch 索引保存焦平面, 但目前的值是复制出来的.
//! 2. 底层存储格式和回归网络本身不在本 crate 内,
//!   分别由 [`FocusDataset`] 和 [`FeatureExtractor`] 两个 trait 抽象.
//!
//! # 开发计划
//!
//! ### patch 几何 ✅
//!
//! 从传感器图像尺寸求 2 的幂次方形 patch 的边长和数量.
//!
//! 实现位于 `focus-berry/src/geometry.rs`.
//!
//! ### 径向平均对数功率谱 ✅
//!
//! 实现位于 `focus-berry/src/spectrum`.
//!
//! ### 三次样条插值 (not-a-knot) 的纯 Rust 实现 ✅
//!
//! 实现位于 `focus-berry/src/fitting`.
//!
//! ### 焦平面估计与持久化缓存 ✅
//!
//! 可选 `rayon` 线程池并行计算各切片的功率谱, 结果与串行执行完全一致.
//!
//! 实现位于 `focus-berry/src/focal`.
//!
//! ### 训练对生成与确定性特征缓存 ✅
//!
//! 实现位于 `focus-berry/src/pairs.rs` 和 `focus-berry/src/features`.
//!
//! ### 逐 patch 焦平面 ⌛️
//!
//! 是否有必要对每个 tile 单独估计焦平面, 取决于目标光学系统. 暂不实现.

/// 二维索引 `(h, w)`, 同时也用作二维形状.
pub type Idx2d = (usize, usize);

pub mod consts;
mod error;
pub mod features;
pub mod fitting;
pub mod focal;
pub mod geometry;
pub mod pairs;
pub mod pool;
pub mod prelude;
pub mod spectrum;

pub mod dataset;

pub use dataset::{FocusDataset, MemoryDataset, NpyStackDataset};
pub use error::{FocusError, FocusResult};
pub use features::{DeterministicParams, FeatureExtractor, RadialSpectrumExtractor};
pub use focal::{FocalPlanes, PatchFocalPlanes};
pub use geometry::PatchGeometry;
pub use pairs::{PairSource, TrainingPair, TrainingPairs};
pub use pool::WorkerPool;

#[cfg(test)]
mod tests {
    use crate::focal::tests::synthetic_stack;
    use crate::prelude::*;
    use std::num::NonZeroUsize;

    #[test]
    fn test_end_to_end_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let stacks = vec![synthetic_stack(5, 2, 32), synthetic_stack(5, 3, 32)];
        let mut datasets = vec![NpyStackDataset::create(dir.path(), 1.0, &stacks).unwrap()];
        let pool = WorkerPool::new(NonZeroUsize::new(2).unwrap()).unwrap();

        let focal_planes = vec![read_or_calc_focal_planes(&mut datasets[0], 2, Some(&pool)).unwrap()];
        assert_eq!(focal_planes[0].len(), 2);
        assert_eq!(focal_planes[0][&0].len(), 4);
        let z0 = focal_planes[0][&0].get(0).unwrap();
        let z1 = focal_planes[0][&1].get(0).unwrap();
        assert!((z0 - 2.0).abs() < 0.75, "z0 = {z0}");
        assert!((z1 - 3.0).abs() < 0.75, "z1 = {z1}");

        let positions = vec![vec![0, 1]];
        {
            let pairs = TrainingPairs::new(
                vec![PairSource {
                    data: &datasets[0],
                    positions: &positions[0],
                    focal_planes: &focal_planes[0],
                }],
                2,
                true,
            )
            .unwrap();
            assert_eq!(pairs.iter().count(), 2 * 4 * 4);
        }

        let params = DeterministicParams::with_split(2);
        let (features, targets) = compile_deterministic_data(
            &mut datasets,
            &positions,
            &focal_planes,
            &params,
            &RadialSpectrumExtractor,
        )
        .unwrap();
        assert_eq!(features.dim(), (32, 8));
        assert!(features.iter().all(|v| v.is_finite()));
        assert!((targets[0] as f64 - (z0 - 1.0)).abs() < 1e-5);

        let geometry = PatchGeometry::new(32, 32, 2).unwrap();
        let training =
            split_feature_vectors(features.view(), targets.view(), SplitMode::Training, &geometry, 0.75)
                .unwrap();
        let validation = split_feature_vectors(
            features.view(),
            targets.view(),
            SplitMode::Validation,
            &geometry,
            0.75,
        )
        .unwrap();
        assert_eq!(training.len(), 24);
        assert_eq!(validation.len(), 8);

        // 重新打开后全部结果都来自缓存.
        let mut reopened = vec![NpyStackDataset::open(dir.path()).unwrap()];
        let again = vec![read_or_calc_focal_planes(&mut reopened[0], 2, None).unwrap()];
        assert_eq!(again, focal_planes);
        let cached =
            compile_deterministic_data(&mut reopened, &positions, &again, &params, &RadialSpectrumExtractor)
                .unwrap();
        assert_eq!(cached, (features, targets));
    }
}
