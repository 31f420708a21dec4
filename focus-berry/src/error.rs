//! 运行时错误.

use ndarray_npy::{ReadNpyError, WriteNpyError};
use std::fmt;

/// 焦平面估计 / 训练数据准备过程中的错误.
#[derive(Debug)]
pub enum FocusError {
    /// z 切片不足以做三次插值.
    TooFewSlices {
        /// 实际切片数.
        found: usize,
        /// 最少需要的切片数.
        required: usize,
    },

    /// `split_k` 必须为正, 且不能大于图像短边.
    InvalidSplit(u32),

    /// 训练集比例必须位于 `[0, 1]`.
    InvalidFraction(f64),

    /// 无法识别的划分方式.
    UnknownSplitMode(String),

    /// 索引越界.
    IndexOutOfRange {
        /// 越界的对象.
        what: &'static str,
        /// 请求的索引.
        index: usize,
        /// 实际长度.
        len: usize,
    },

    /// 数组形状或长度不一致.
    ShapeMismatch {
        /// 不一致的对象.
        what: &'static str,
        /// 期望值.
        expected: usize,
        /// 实际值.
        found: usize,
    },

    /// 清晰度分数中出现 NaN.
    NonFiniteScore,

    /// 样条方程组奇异.
    SingularSystem,

    /// 线程池创建失败.
    Pool(rayon::ThreadPoolBuildError),

    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 读取 npy 文件错误.
    ReadNpy(ReadNpyError),

    /// 写入 npy 文件错误.
    WriteNpy(WriteNpyError),

    /// ndarray 形状转换错误.
    Shape(ndarray::ShapeError),

    /// bincode 编解码错误.
    Encode(bincode::Error),
}

impl fmt::Display for FocusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSlices { found, required } => {
                write!(f, "焦平面求解至少需要 {required} 个 z 切片, 实际只有 {found} 个")
            }
            Self::InvalidSplit(k) => write!(f, "split_k `{k}` 非法: 必须为正且不大于图像短边"),
            Self::InvalidFraction(r) => write!(f, "训练集比例必须位于 [0, 1], 但得到 `{r}`"),
            Self::UnknownSplitMode(m) => {
                write!(f, "未知的划分方式 `{m}`, 可选 training / validation / all")
            }
            Self::IndexOutOfRange { what, index, len } => {
                write!(f, "{what} 索引 {index} 越界 (长度 {len})")
            }
            Self::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what} 不一致: 期望 {expected}, 实际 {found}"),
            Self::NonFiniteScore => write!(f, "清晰度分数中出现 NaN"),
            Self::SingularSystem => write!(f, "样条方程组奇异"),
            Self::Pool(e) => write!(f, "线程池创建失败: {e}"),
            Self::Io(e) => write!(f, "I/O 错误: {e}"),
            Self::ReadNpy(e) => write!(f, "读取 npy 错误: {e}"),
            Self::WriteNpy(e) => write!(f, "写入 npy 错误: {e}"),
            Self::Shape(e) => write!(f, "数组形状错误: {e}"),
            Self::Encode(e) => write!(f, "bincode 编解码错误: {e}"),
        }
    }
}

impl std::error::Error for FocusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::ReadNpy(e) => Some(e),
            Self::WriteNpy(e) => Some(e),
            Self::Shape(e) => Some(e),
            Self::Encode(e) => Some(&**e),
            _ => None,
        }
    }
}

macro_rules! impl_from_error {
    ($($source: ty => $variant: ident),+) => {
        $(
            impl From<$source> for FocusError {
                #[inline]
                fn from(e: $source) -> Self {
                    Self::$variant(e)
                }
            }
        )+
    };
}

impl_from_error!(
    rayon::ThreadPoolBuildError => Pool,
    std::io::Error => Io,
    ReadNpyError => ReadNpy,
    WriteNpyError => WriteNpy,
    ndarray::ShapeError => Shape,
    bincode::Error => Encode
);

/// 本 crate 的运行时结果.
pub type FocusResult<T> = Result<T, FocusError>;
