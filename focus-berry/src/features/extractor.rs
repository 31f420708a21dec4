//! 径向功率谱特征提取器.

use super::{DesignMatrix, DeterministicParams, FeatureExtractor};
use crate::dataset::FocusDataset;
use crate::pairs::TrainingPairs;
use crate::spectrum::spectral_sharpness;
use crate::{FocusError, FocusResult, Idx2d};
use ndarray::{s, Array1, Array2};

/// 以 patch 的径向平均对数功率谱作为特征向量的确定性前端.
///
/// 特征长度为 `min(h, w) / 2` (至少为 1), 若指定了 `max_radial_bins` 则截断到该长度.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialSpectrumExtractor;

impl RadialSpectrumExtractor {
    /// 给定输入形状和参数时的特征长度.
    pub fn feature_len(input_shape: Idx2d, params: &DeterministicParams) -> usize {
        let bins = (input_shape.0.min(input_shape.1) / 2).max(1);
        params.max_radial_bins.map_or(bins, |m| m.min(bins))
    }
}

impl FeatureExtractor for RadialSpectrumExtractor {
    fn extract<D: FocusDataset + ?Sized>(
        &self,
        pairs: &TrainingPairs<'_, D>,
        input_shape: Idx2d,
        params: &DeterministicParams,
    ) -> FocusResult<DesignMatrix> {
        let width = Self::feature_len(input_shape, params);
        let mut features = Array2::<f32>::zeros((pairs.len(), width));
        let mut targets = Array1::<f32>::zeros(pairs.len());

        for (i, pair) in pairs.iter().enumerate() {
            let pair = pair?;
            if pair.patch.dim() != input_shape {
                return Err(FocusError::ShapeMismatch {
                    what: "patch pixel count",
                    expected: input_shape.0 * input_shape.1,
                    found: pair.patch.len(),
                });
            }
            let profile = spectral_sharpness(pair.patch.view());
            features
                .row_mut(i)
                .assign(&profile.slice(s![..width]).mapv(|v| v as f32));
            targets[i] = pair.defocus_dist as f32;
        }
        Ok((features, targets))
    }
}
