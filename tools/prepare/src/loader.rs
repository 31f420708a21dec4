//! 运行参数: 环境变量优先, 否则取默认值.

use focus_berry::{FocusError, FocusResult};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// 获取数据集目录列表.
///
/// 1. 若环境变量 `$FOCUS_DATASET_DIR` 非空, 则按 `:` 分隔返回其中各项;
/// 2. 否则, 返回 `$HOME/dataset/focus`.
pub fn dataset_dirs_from_env_or_home() -> Vec<PathBuf> {
    match env::var("FOCUS_DATASET_DIR") {
        Ok(d) if !d.is_empty() => env::split_paths(&d).collect(),
        _ => focus_berry::dataset::home_dataset_dir_with(["focus"])
            .into_iter()
            .collect(),
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring malformed `${key}`: `{v}`");
            default
        }),
        Err(_) => default,
    }
}

/// 每个方向上的 patch 切分数, `$FOCUS_SPLIT_K`, 默认为 2.
pub fn split_k() -> u32 {
    parse_env("FOCUS_SPLIT_K", 2)
}

/// 训练集比例, `$FOCUS_TRAINING_FRACTION`, 默认为 0.8.
pub fn training_fraction() -> FocusResult<f64> {
    let r = parse_env("FOCUS_TRAINING_FRACTION", 0.8);
    if (0.0..=1.0).contains(&r) {
        Ok(r)
    } else {
        Err(FocusError::InvalidFraction(r))
    }
}

/// 获得可并行核心数, `$FOCUS_CORES` 优先.
pub fn cpus() -> usize {
    let available =
        std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from);
    parse_env("FOCUS_CORES", available).max(1)
}
