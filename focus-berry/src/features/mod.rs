//! 确定性特征 (设计矩阵) 的计算与缓存.
//!
//! 设计矩阵对应回归网络中不可训练的确定性前端的输出. 计算代价高,
//! 因此以参数标识串为键保存在数据集中, 参数不变时直接读取.

mod extractor;
mod params;
mod split;

pub use extractor::RadialSpectrumExtractor;
pub use params::DeterministicParams;
pub use split::{split_feature_vectors, FeatureSplit, SplitMode};

use crate::consts::{defocus_dists_key, features_key};
use crate::dataset::FocusDataset;
use crate::focal::FocalPlanes;
use crate::pairs::{PairSource, TrainingPairs};
use crate::{FocusError, FocusResult, Idx2d};
use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis, Ix1, Ix2};

/// `(特征, 目标)`: 每行一个样本的特征矩阵与对应的离焦距离.
pub type DesignMatrix = (Array2<f32>, Array1<f32>);

/// 确定性特征提取器: 从训练对序列到设计矩阵的纯函数, 自身不保存任何持久状态.
pub trait FeatureExtractor {
    /// 遍历 `pairs`, 得到设计矩阵. `input_shape` 是 patch 形状 `(h, w)`.
    fn extract<D: FocusDataset + ?Sized>(
        &self,
        pairs: &TrainingPairs<'_, D>,
        input_shape: Idx2d,
        params: &DeterministicParams,
    ) -> FocusResult<DesignMatrix>;
}

#[inline]
fn check_rows(features: &Array2<f32>, targets: &Array1<f32>) -> FocusResult<()> {
    if features.nrows() != targets.len() {
        return Err(FocusError::ShapeMismatch {
            what: "design matrix rows",
            expected: features.nrows(),
            found: targets.len(),
        });
    }
    Ok(())
}

/// 读取已保存的设计矩阵, 或用 `extractor` 计算后保存.
///
/// 缓存键为 `features_<id>` 与 `defocus_dists_<id>`, 其中 `id` 为
/// [`DeterministicParams::id_string`]. 任一缺失即重新计算.
/// 计算时使用该数据集 `positions` 中的视野, 并始终跳过每个视野的第 0 层.
pub fn read_or_calc_design_mat<D, E>(
    data: &mut D,
    positions: &[usize],
    focal_planes: &FocalPlanes,
    params: &DeterministicParams,
    extractor: &E,
) -> FocusResult<DesignMatrix>
where
    D: FocusDataset + ?Sized,
    E: FeatureExtractor,
{
    let id = params.id_string();
    let feature_name = features_key(&id);
    let defocus_name = defocus_dists_key(&id);

    if let (Some(features), Some(targets)) =
        (data.read_array(&feature_name)?, data.read_array(&defocus_name)?)
    {
        log::info!("Reading precomputed design matrix `{id}`");
        let features = features.into_dimensionality::<Ix2>()?;
        let targets = targets.into_dimensionality::<Ix1>()?;
        check_rows(&features, &targets)?;
        return Ok((features, targets));
    }

    log::info!("Computing design matrix `{id}`");
    let (features, targets) = {
        let source = PairSource {
            data: &*data,
            positions,
            focal_planes,
        };
        let pairs = TrainingPairs::new(vec![source], params.tile_split_k, true)?;
        let input_shape = pairs.patch_shape().ok_or(FocusError::ShapeMismatch {
            what: "patch shapes across sources",
            expected: 1,
            found: 0,
        })?;
        extractor.extract(&pairs, input_shape, params)?
    };
    check_rows(&features, &targets)?;

    data.store_array(&feature_name, features.view().into_dyn())?;
    data.store_array(&defocus_name, targets.view().into_dyn())?;
    Ok((features, targets))
}

/// 对每个数据集读取或计算设计矩阵, 并按输入顺序沿样本方向拼接.
///
/// `datasets`, `positions_list` 和 `focal_planes` 必须一一对应.
pub fn compile_deterministic_data<D, E>(
    datasets: &mut [D],
    positions_list: &[Vec<usize>],
    focal_planes: &[FocalPlanes],
    params: &DeterministicParams,
    extractor: &E,
) -> FocusResult<DesignMatrix>
where
    D: FocusDataset,
    E: FeatureExtractor,
{
    for len in [positions_list.len(), focal_planes.len()] {
        if len != datasets.len() {
            return Err(FocusError::ShapeMismatch {
                what: "dataset list length",
                expected: datasets.len(),
                found: len,
            });
        }
    }

    let parts = datasets
        .iter_mut()
        .zip(positions_list)
        .zip(focal_planes)
        .map(|((data, positions), planes)| {
            read_or_calc_design_mat(data, positions, planes, params, extractor)
        })
        .collect::<FocusResult<Vec<_>>>()?;
    pool_design_matrices(&parts)
}

/// 沿样本方向拼接多个设计矩阵. 特征长度不一致或行数与目标数不一致时返回错误.
pub fn pool_design_matrices(parts: &[DesignMatrix]) -> FocusResult<DesignMatrix> {
    if parts.is_empty() {
        return Ok((Array2::zeros((0, 0)), Array1::zeros(0)));
    }
    for (f, t) in parts {
        check_rows(f, t)?;
    }
    let features: Vec<ArrayView2<f32>> = parts.iter().map(|(f, _)| f.view()).collect();
    let targets: Vec<ArrayView1<f32>> = parts.iter().map(|(_, t)| t.view()).collect();
    let features = concatenate(Axis(0), &features)?;
    let targets = concatenate(Axis(0), &targets)?;
    check_rows(&features, &targets)?;
    Ok((features, targets))
}
