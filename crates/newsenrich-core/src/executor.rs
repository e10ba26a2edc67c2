//! Bounded-parallelism executors.
//!
//! [`BoundedExecutor`] is the one seam between the scheduler and the
//! concurrency primitive: "run these N tasks with at most `limit` running at
//! once, and give the results back in task order". Two providers exist:
//!
//! - [`ThreadExecutor`]: dedicated rayon pool, workers pull from a
//!   [`WorkQueue`].
//! - [`AsyncExecutor`]: dedicated tokio runtime, tasks admitted through an
//!   async semaphore onto the blocking pool.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;

use crate::work_queue::WorkQueue;

/// Which executor provider to use for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    Thread,
    #[default]
    Async,
}

impl ExecutorKind {
    pub const ALL: [Self; 2] = [Self::Thread, Self::Async];

    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "thread" | "threads" => Some(Self::Thread),
            "async" => Some(Self::Async),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Async => "async",
        }
    }
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Run a group of independent tasks with bounded parallelism.
///
/// Implementations must return exactly one result per task, in the order the
/// tasks were given, and never run more than [`limit`](Self::limit) tasks at
/// the same time. A panicking task propagates its panic to the caller.
pub trait BoundedExecutor: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Maximum number of tasks running at once
    fn limit(&self) -> usize;

    fn run_all<T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static;
}

/// Native threads: a rayon pool sized to the limit.
pub struct ThreadExecutor {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl ThreadExecutor {
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("enrich-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }
}

impl std::fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl BoundedExecutor for ThreadExecutor {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn limit(&self) -> usize {
        self.workers
    }

    fn run_all<T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let n = tasks.len();
        if n == 0 {
            return Vec::new();
        }

        let queue = WorkQueue::new(tasks.into_iter().map(|t| Mutex::new(Some(t))).collect());
        let slots: Vec<Mutex<Option<T>>> = (0..n).map(|_| Mutex::new(None)).collect();
        let spawn_count = self.workers.min(n);

        self.pool.install(|| {
            rayon::scope(|s| {
                for _ in 0..spawn_count {
                    s.spawn(|_| {
                        while let Some((i, cell)) = queue.next() {
                            let task = cell.lock().unwrap_or_else(PoisonError::into_inner).take();
                            if let Some(task) = task {
                                let out = task();
                                *slots[i].lock().unwrap_or_else(PoisonError::into_inner) = Some(out);
                            }
                        }
                    });
                }
            });
        });

        slots
            .into_iter()
            .filter_map(|slot| slot.into_inner().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }
}

/// Cooperative tasks: a tokio runtime whose blocking pool runs the tasks,
/// admitted one permit at a time in dispatch order.
pub struct AsyncExecutor {
    runtime: tokio::runtime::Runtime,
    limit: usize,
}

impl AsyncExecutor {
    pub fn new(limit: usize) -> std::io::Result<Self> {
        let limit = limit.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(limit)
            .thread_name("enrich-async")
            .enable_all()
            .build()?;
        Ok(Self { runtime, limit })
    }
}

impl std::fmt::Debug for AsyncExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncExecutor")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl BoundedExecutor for AsyncExecutor {
    fn name(&self) -> &'static str {
        "async"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn run_all<T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if tasks.is_empty() {
            return Vec::new();
        }
        let gate = Arc::new(tokio::sync::Semaphore::new(self.limit));

        self.runtime.block_on(async move {
            let mut handles = Vec::with_capacity(tasks.len());
            for task in tasks {
                let permit = gate
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("admission gate is never closed");
                handles.push(tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    task()
                }));
            }

            join_all(handles)
                .await
                .into_iter()
                .map(|joined| match joined {
                    Ok(v) => v,
                    Err(e) => std::panic::resume_unwind(e.into_panic()),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tracked_tasks(
        n: usize,
        active: &Arc<AtomicUsize>,
        peak: &Arc<AtomicUsize>,
    ) -> Vec<impl FnOnce() -> usize + Send + 'static> {
        (0..n)
            .map(|i| {
                let (active, peak) = (active.clone(), peak.clone());
                move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Later tasks finish first so completion order differs from input order
                    std::thread::sleep(Duration::from_millis(((n - i) % 4) as u64 * 3));
                    active.fetch_sub(1, Ordering::SeqCst);
                    i * 10
                }
            })
            .collect()
    }

    fn check_executor(exec: &impl BoundedExecutor) {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let out = exec.run_all(tracked_tasks(25, &active, &peak));
        assert_eq!(out, (0..25).map(|i| i * 10).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= exec.limit());
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn thread_executor_order_and_bound() {
        let exec = ThreadExecutor::new(3).unwrap();
        check_executor(&exec);
    }

    #[test]
    fn async_executor_order_and_bound() {
        let exec = AsyncExecutor::new(3).unwrap();
        check_executor(&exec);
    }

    #[test]
    fn empty_task_list() {
        let exec = ThreadExecutor::new(2).unwrap();
        let out: Vec<u8> = exec.run_all(Vec::<fn() -> u8>::new());
        assert!(out.is_empty());
        let exec = AsyncExecutor::new(2).unwrap();
        let out: Vec<u8> = exec.run_all(Vec::<fn() -> u8>::new());
        assert!(out.is_empty());
    }

    #[test]
    fn executors_are_reusable_across_groups() {
        let exec = AsyncExecutor::new(2).unwrap();
        for round in 0..3usize {
            let tasks: Vec<_> = (0..4).map(|i| move || round * 100 + i).collect();
            let out = exec.run_all(tasks);
            assert_eq!(out, vec![round * 100, round * 100 + 1, round * 100 + 2, round * 100 + 3]);
        }
    }

    #[test]
    fn zero_limit_is_clamped() {
        assert_eq!(ThreadExecutor::new(0).unwrap().limit(), 1);
        assert_eq!(AsyncExecutor::new(0).unwrap().limit(), 1);
    }

    #[test]
    fn kind_from_name() {
        assert_eq!(ExecutorKind::from_name("thread"), Some(ExecutorKind::Thread));
        assert_eq!(ExecutorKind::from_name("ASYNC"), Some(ExecutorKind::Async));
        assert_eq!(ExecutorKind::from_name("fibers"), None);
        assert_eq!(ExecutorKind::default(), ExecutorKind::Async);
        assert_eq!(ExecutorKind::Thread.to_string(), "thread");
        for kind in ExecutorKind::ALL {
            assert_eq!(ExecutorKind::from_name(kind.name()), Some(kind));
        }
    }
}
