//! Deferred execution: the per-tick task queue and the background worker pool

use crate::error::RuntimeError;
use crate::plugin::PluginInfo;
use crate::utils::catch_panic;
use crate::version::VersionNumber;
use std::fmt;
use std::mem;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error};

/// A zero-argument unit of deferred work
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Tasks collected between host ticks
///
/// Enqueueing is safe from any thread. [`drain`](Self::drain) swaps the queue
/// out under the lock before running anything, so tasks enqueued while a
/// drain is in progress run on the following drain.
#[derive(Default)]
pub struct TickQueue {
    tasks: Mutex<Vec<DeferredTask>>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(task));
    }

    /// Runs `task` on the next tick
    pub fn next_tick(&self, task: impl FnOnce() + Send + 'static) {
        self.enqueue(task);
    }

    /// Same queue as [`next_tick`](Self::next_tick)
    pub fn next_frame(&self, task: impl FnOnce() + Send + 'static) {
        self.enqueue(task);
    }

    /// Runs every queued task in enqueue order, returning how many ran
    ///
    /// A panicking task is logged and the rest still run.
    pub fn drain(&self) -> usize {
        let tasks = mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let count = tasks.len();

        for task in tasks {
            if let Err(message) = catch_panic(task) {
                error!("❌ Tick task panicked: {}", message);
            }
        }

        count
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue").field("queued", &self.len()).finish()
    }
}

/// Fire-and-forget background execution on a dedicated thread pool
///
/// Worker tasks must not touch lifecycle state; they hand results back by
/// enqueueing a tick task.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Builds a pool with `threads` workers, or one per CPU when `threads` is 0
    pub fn new(threads: usize) -> Result<Self, RuntimeError> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("hook-worker-{}", i))
            .build()?;
        debug!("🧵 Worker pool started with {} threads", threads);
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task` on a worker, tagging any failure with the owning plugin
    pub fn spawn(&self, owner: &PluginInfo, task: impl FnOnce() + Send + 'static) {
        self.spawn_tagged(owner.name.clone(), owner.version, task);
    }

    pub(crate) fn spawn_tagged(
        &self,
        name: String,
        version: VersionNumber,
        task: impl FnOnce() + Send + 'static,
    ) {
        self.pool.spawn(move || {
            if let Err(message) = catch_panic(task) {
                error!(
                    plugin = %name,
                    version = %version,
                    "❌ Worker thread callback failed in '{} v{}': {}",
                    name,
                    version,
                    message
                );
            }
        });
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
