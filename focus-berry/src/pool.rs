//! 可注入的工作线程池.

use crate::FocusResult;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::ThreadPool;
use std::num::NonZeroUsize;

/// 有界工作线程池. 只用于纯函数式的并行映射, 不持有任何共享可变状态.
pub struct WorkerPool {
    inner: ThreadPool,
}

impl WorkerPool {
    /// 创建含 `threads` 个工作线程的线程池.
    pub fn new(threads: NonZeroUsize) -> FocusResult<Self> {
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(|i| format!("focus-worker-{i}"))
            .build()?;
        Ok(Self { inner })
    }

    /// 工作线程个数.
    #[inline]
    pub fn threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    /// 在线程池内对 `items` 逐个实施 `op`, 结果按输入顺序排列.
    pub fn map_ordered<T, R, F>(&self, items: &[T], op: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.inner.install(|| items.par_iter().map(op).collect())
    }
}

/// 有线程池时并行映射, 否则顺序映射. 两条路径的结果完全相同.
pub(crate) fn map_maybe_parallel<T, R, F>(pool: Option<&WorkerPool>, items: &[T], op: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    match pool {
        Some(pool) => pool.map_ordered(items, op),
        None => items.iter().map(op).collect(),
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
