//! 通用常量.

/// 焦平面求解所需的最少 z 切片数. 少于该值时三次插值不稳定.
pub const MIN_Z_SLICES: usize = 4;

/// 三次插值曲线上的稠密重采样点数.
pub const INTERP_POINTS: usize = 10_000;

/// 径向功率谱中, 从 `bins / HIGH_FREQ_DIVISOR` 开始的部分计入清晰度.
pub const HIGH_FREQ_DIVISOR: usize = 4;

/// 训练集样本打乱所用的固定随机种子.
pub const TRAINING_SHUFFLE_SEED: u64 = 123;

/// 视野分组 (训练/验证划分) 打乱所用的固定随机种子.
pub const GROUP_SHUFFLE_SEED: u64 = 0x5eed;

/// 功率为 0 时参与取对数的替代值. `ln` 之后约为 `-708.4`.
pub const POWER_FLOOR: f64 = f64::MIN_POSITIVE;

/// 第 `position_index` 个视野焦平面的持久化名称.
#[inline]
pub fn focal_plane_key(position_index: usize) -> String {
    format!("pos{position_index}_focal_plane")
}

/// 设计矩阵特征的持久化名称.
#[inline]
pub fn features_key(param_id: &str) -> String {
    format!("features_{param_id}")
}

/// 设计矩阵目标值 (离焦距离) 的持久化名称.
#[inline]
pub fn defocus_dists_key(param_id: &str) -> String {
    format!("defocus_dists_{param_id}")
}
