//! 🔬欢迎光临🔭
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::consts::{INTERP_POINTS, MIN_Z_SLICES};
pub use crate::dataset::{home_dataset_dir, home_dataset_dir_with};
pub use crate::dataset::{AnnotationStore, FocusDataset, MemoryDataset, NpyStackDataset};

pub use crate::features::{
    compile_deterministic_data, read_or_calc_design_mat, split_feature_vectors, DesignMatrix,
    DeterministicParams, FeatureExtractor, FeatureSplit, RadialSpectrumExtractor, SplitMode,
};
pub use crate::focal::{
    calc_focal_plane, read_or_calc_focal_plane, read_or_calc_focal_planes, FocalPlanes,
    PatchFocalPlanes,
};
pub use crate::geometry::{patch_metadata, PatchGeometry};
pub use crate::pairs::{PairSource, TrainingPair, TrainingPairs};
pub use crate::pool::WorkerPool;
pub use crate::spectrum::spectral_sharpness;

pub use crate::{FocusError, FocusResult};
