//! 训练集 / 验证集划分.
//!
//! 来自同一视野同一切片的全部 patch 必须落在同一侧,
//! 因此按连续的 [`PatchGeometry::patches_per_image`] 行为一组进行划分.

use crate::consts::{GROUP_SHUFFLE_SEED, TRAINING_SHUFFLE_SEED};
use crate::{FocusError, FocusResult, PatchGeometry};
use ndarray::{ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::str::FromStr;

/// 划分方式.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// 训练集: 按固定种子打乱.
    Training,
    /// 验证集: 与训练集互补的组, 保持原有顺序.
    Validation,
    /// 全部样本, 保持原有顺序.
    All,
}

impl FromStr for SplitMode {
    type Err = FocusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training" => Ok(Self::Training),
            "validation" => Ok(Self::Validation),
            "all" => Ok(Self::All),
            other => Err(FocusError::UnknownSplitMode(other.to_owned())),
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Training => "training",
            Self::Validation => "validation",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

/// 划分结果. 只保存样本下标, 可以反复从头遍历.
#[derive(Debug, Clone)]
pub struct FeatureSplit<'a> {
    features: ArrayView2<'a, f32>,
    targets: ArrayView1<'a, f32>,
    indices: Vec<usize>,
}

impl<'a> FeatureSplit<'a> {
    /// 样本数.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// 按产出顺序排列的样本行号.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// 从头产出 `(特征, 目标)`.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (ArrayView1<'a, f32>, f32)> + '_ {
        self.indices
            .iter()
            .map(|&i| (self.features.index_axis_move(Axis(0), i), self.targets[i]))
    }
}

/// 把设计矩阵划分为训练集或验证集.
///
/// 样本以 `geometry.patches_per_image()` 行为一组 (同一视野同一切片的全部 patch).
/// 该值仅在 patch 恰好铺满图像时等于 `split_k^2`. 组下标用固定种子打乱后,
/// 前 `floor(组数 × training_fraction)` 组为训练集, 其余为验证集.
/// 训练集的样本再用固定种子整体打乱; 验证集与 `All` 保持升序.
///
/// 相同输入总是得到相同结果.
pub fn split_feature_vectors<'a>(
    features: ArrayView2<'a, f32>,
    targets: ArrayView1<'a, f32>,
    mode: SplitMode,
    geometry: &PatchGeometry,
    training_fraction: f64,
) -> FocusResult<FeatureSplit<'a>> {
    let n = features.nrows();
    if targets.len() != n {
        return Err(FocusError::ShapeMismatch {
            what: "design matrix rows",
            expected: n,
            found: targets.len(),
        });
    }
    if !(0.0..=1.0).contains(&training_fraction) {
        return Err(FocusError::InvalidFraction(training_fraction));
    }
    let group = geometry.patches_per_image();
    if n % group != 0 {
        return Err(FocusError::ShapeMismatch {
            what: "sample count (multiple of patches per image)",
            expected: n - n % group,
            found: n,
        });
    }

    let groups = n / group;
    let mut ids: Vec<usize> = (0..groups).collect();
    ids.shuffle(&mut StdRng::seed_from_u64(GROUP_SHUFFLE_SEED));
    let num_training = (groups as f64 * training_fraction).floor() as usize;

    let selected = match mode {
        SplitMode::Training => ids[..num_training].to_vec(),
        SplitMode::Validation => {
            let mut v = ids[num_training..].to_vec();
            v.sort_unstable();
            v
        }
        SplitMode::All => (0..groups).collect(),
    };
    let mut indices: Vec<usize> = selected
        .into_iter()
        .flat_map(|g| g * group..(g + 1) * group)
        .collect();
    if mode == SplitMode::Training {
        indices.shuffle(&mut StdRng::seed_from_u64(TRAINING_SHUFFLE_SEED));
    }
    log::debug!("{mode} split: {} of {n} samples", indices.len());

    Ok(FeatureSplit {
        features,
        targets,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use std::collections::HashSet;

    /// 8x8 图像: `split_k = 1` 时 1 个 patch, `split_k = 2` 时 4 个.
    fn tiles(split_k: u32) -> PatchGeometry {
        PatchGeometry::new(8, 8, split_k).unwrap()
    }

    fn design(n: usize) -> (Array2<f32>, Array1<f32>) {
        let f = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f32);
        let t = Array1::from_shape_fn(n, |i| i as f32);
        (f, t)
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("training".parse::<SplitMode>().unwrap(), SplitMode::Training);
        assert_eq!("validation".parse::<SplitMode>().unwrap(), SplitMode::Validation);
        assert_eq!("all".parse::<SplitMode>().unwrap(), SplitMode::All);
        assert!(matches!(
            "trianing".parse::<SplitMode>(),
            Err(FocusError::UnknownSplitMode(_))
        ));
        assert_eq!(SplitMode::Validation.to_string(), "validation");
    }

    #[test]
    fn test_groups_stay_together() {
        let (f, t) = design(160);
        let train = split_feature_vectors(f.view(), t.view(), SplitMode::Training, &tiles(2), 0.8).unwrap();
        let valid = split_feature_vectors(f.view(), t.view(), SplitMode::Validation, &tiles(2), 0.8).unwrap();
        assert_eq!(train.len(), 128);
        assert_eq!(valid.len(), 32);

        let train_groups: HashSet<usize> = train.indices().iter().map(|i| i / 4).collect();
        let valid_groups: HashSet<usize> = valid.indices().iter().map(|i| i / 4).collect();
        assert_eq!(train_groups.len(), 32);
        assert_eq!(valid_groups.len(), 8);
        assert!(train_groups.is_disjoint(&valid_groups));

        let all: HashSet<usize> = train.indices().iter().chain(valid.indices()).copied().collect();
        assert_eq!(all.len(), 160);
        assert!(valid.indices().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_partial_tiling_keeps_positions_apart() {
        use crate::pairs::{PairSource, TrainingPairs};
        use crate::{FocalPlanes, MemoryDataset, PatchFocalPlanes};
        use ndarray::Array3;

        // 40x40, split_k = 3: patch 边长 8, 每幅图 25 个 patch, 而不是 9 个.
        let geometry = PatchGeometry::new(40, 40, 3).unwrap();
        assert_eq!(geometry.patches_per_image(), 25);

        let data = MemoryDataset::new(1.0, vec![Array3::zeros((2, 40, 40)); 9]).unwrap();
        let fp: FocalPlanes = (0..9).map(|p| (p, PatchFocalPlanes::uniform(1.0, 25))).collect();
        let positions: Vec<usize> = (0..9).collect();
        let pairs = TrainingPairs::new(
            vec![PairSource {
                data: &data,
                positions: &positions,
                focal_planes: &fp,
            }],
            3,
            true,
        )
        .unwrap();
        assert_eq!(pairs.len(), 225);

        // 每个视野只保留 1 层, 第 i 行来自视野 i / 25.
        let (f, t) = design(pairs.len());
        let train =
            split_feature_vectors(f.view(), t.view(), SplitMode::Training, &geometry, 0.8).unwrap();
        let valid =
            split_feature_vectors(f.view(), t.view(), SplitMode::Validation, &geometry, 0.8).unwrap();
        let train_fov: HashSet<usize> = train.indices().iter().map(|i| i / 25).collect();
        let valid_fov: HashSet<usize> = valid.indices().iter().map(|i| i / 25).collect();
        assert_eq!(train_fov.len(), 7);
        assert_eq!(valid_fov.len(), 2);
        assert!(train_fov.is_disjoint(&valid_fov));
        assert_eq!(train.len() + valid.len(), 225);
    }

    #[test]
    fn test_training_is_reproducible_and_restartable() {
        let (f, t) = design(64);
        let a = split_feature_vectors(f.view(), t.view(), SplitMode::Training, &tiles(2), 0.5).unwrap();
        let b = split_feature_vectors(f.view(), t.view(), SplitMode::Training, &tiles(2), 0.5).unwrap();
        assert_eq!(a.indices(), b.indices());

        let first: Vec<f32> = a.iter().map(|(_, y)| y).collect();
        let second: Vec<f32> = a.iter().map(|(_, y)| y).collect();
        assert_eq!(first, second);
        assert_eq!(a.iter().len(), 32);
        for (x, y) in a.iter() {
            assert_eq!(x[0], y * 3.0);
        }
    }

    #[test]
    fn test_all_and_extremes() {
        let (f, t) = design(12);
        let all = split_feature_vectors(f.view(), t.view(), SplitMode::All, &tiles(1), 0.3).unwrap();
        assert_eq!(all.indices(), (0..12).collect::<Vec<_>>().as_slice());

        let none = split_feature_vectors(f.view(), t.view(), SplitMode::Training, &tiles(2), 0.0).unwrap();
        assert!(none.is_empty());
        let every = split_feature_vectors(f.view(), t.view(), SplitMode::Validation, &tiles(2), 0.0).unwrap();
        assert_eq!(every.len(), 12);
    }

    #[test]
    fn test_invalid_inputs() {
        let (f, t) = design(10);
        assert!(matches!(
            split_feature_vectors(f.view(), t.view(), SplitMode::All, &tiles(2), 0.5),
            Err(FocusError::ShapeMismatch { found: 10, .. })
        ));
        assert!(matches!(
            split_feature_vectors(f.view(), t.view(), SplitMode::All, &tiles(1), 1.5),
            Err(FocusError::InvalidFraction(_))
        ));
        assert!(matches!(
            split_feature_vectors(f.view(), t.view(), SplitMode::All, &tiles(1), f64::NAN),
            Err(FocusError::InvalidFraction(_))
        ));
        assert!(matches!(
            split_feature_vectors(f.view(), t.slice(ndarray::s![..9]), SplitMode::All, &tiles(1), 0.5),
            Err(FocusError::ShapeMismatch { .. })
        ));
    }
}
