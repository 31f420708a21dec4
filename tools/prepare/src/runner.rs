//! 程序运行函数.

use crate::loader;
use focus_berry::prelude::*;
use std::num::NonZeroUsize;

/// 实际运行.
pub fn run() -> FocusResult<()> {
    let dirs = loader::dataset_dirs_from_env_or_home();
    let split_k = loader::split_k();
    let fraction = loader::training_fraction()?;
    let cores = NonZeroUsize::new(loader::cpus()).unwrap_or(NonZeroUsize::MIN);
    log::info!(
        "{} dataset(s), split_k = {split_k}, {cores} worker thread(s)",
        dirs.len()
    );

    let pool = WorkerPool::new(cores)?;
    let mut datasets = dirs
        .iter()
        .map(NpyStackDataset::open)
        .collect::<FocusResult<Vec<_>>>()?;

    for d in &datasets {
        log::info!(
            "Opened `{}`: {} position(s), {}x{}",
            d.root().display(),
            d.num_positions(),
            d.image_width(),
            d.image_height()
        );
    }

    let focal_planes = datasets
        .iter_mut()
        .map(|d| read_or_calc_focal_planes(d, split_k, Some(&pool)))
        .collect::<FocusResult<Vec<_>>>()?;
    let positions: Vec<Vec<usize>> = datasets
        .iter()
        .map(|d| (0..d.num_positions()).collect())
        .collect();

    let params = DeterministicParams::with_split(split_k);
    let (features, targets) = compile_deterministic_data(
        &mut datasets,
        &positions,
        &focal_planes,
        &params,
        &RadialSpectrumExtractor,
    )?;
    log::info!(
        "Design matrix `{params}`: {} samples x {} features",
        features.nrows(),
        features.ncols()
    );

    // 合并后的样本按 patch 分组, 各数据集的 patch 数必须一致.
    let geometries = datasets
        .iter()
        .map(|d| PatchGeometry::new(d.image_width(), d.image_height(), split_k))
        .collect::<FocusResult<Vec<_>>>()?;
    let Some(geometry) = geometries.first() else {
        log::warn!("No dataset found");
        return Ok(());
    };
    if let Some(g) = geometries
        .iter()
        .find(|g| g.patches_per_image() != geometry.patches_per_image())
    {
        return Err(FocusError::ShapeMismatch {
            what: "patches per image across datasets",
            expected: geometry.patches_per_image(),
            found: g.patches_per_image(),
        });
    }

    for mode in [SplitMode::Training, SplitMode::Validation] {
        let split =
            split_feature_vectors(features.view(), targets.view(), mode, geometry, fraction)?;
        log::info!("{mode}: {} samples", split.len());
    }
    Ok(())
}
