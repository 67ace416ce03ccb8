//! The executor capability: where fetch work actually runs.

use std::sync::Arc;

use futures::executor::ThreadPool;
use futures::task::SpawnExt;

use crate::error::{FetchError, FetchResult};
use crate::BoxFut;

/// Schedules a unit of work. The single requirement is that a scheduled
/// task eventually runs; the runner's correctness does not depend on
/// parallelism, only on eventual completion.
///
/// The default is a [`ThreadPool`]; single-threaded hosts can use
/// [`ThreadExecutor`] or supply their own implementation.
pub trait Executor: Send + Sync {
    /// Schedule `task` to run.
    fn execute(&self, task: BoxFut<'static, ()>);
}

/// Trait object [Executor].
pub type DynExecutor = Arc<dyn Executor>;

impl Executor for ThreadPool {
    fn execute(&self, task: BoxFut<'static, ()>) {
        // spawn_ok panics only if the pool is shut down, which ThreadPool
        // does not expose; spawn gives us the Result surface instead.
        if let Err(err) = self.spawn(task) {
            tracing::warn!("thread pool refused a fetch task: {err}");
        }
    }
}

/// A minimal executor that runs each task to completion on a dedicated
/// thread. No pooling, no queue; suitable for hosts without a pool and for
/// tests that want the plainest possible scheduling.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, task: BoxFut<'static, ()>) {
        std::thread::spawn(move || futures::executor::block_on(task));
    }
}

/// The executor used when the run options name none.
pub(crate) fn default_executor() -> FetchResult<DynExecutor> {
    ThreadPool::new()
        .map(|pool| Arc::new(pool) as DynExecutor)
        .map_err(|err| FetchError::executor(format!("failed to start default thread pool: {err}")))
}
