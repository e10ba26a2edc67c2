//! newsenrich core - shared infrastructure for the enrichment pipeline
//!
//! Concurrency primitives (executors, admission gate, work queue), retry,
//! shared HTTP plumbing, shutdown handling, logging and progress output.

pub mod executor;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod semaphore;
pub mod shutdown;
pub mod work_queue;

// Re-exports for convenience
pub use executor::{AsyncExecutor, BoundedExecutor, ExecutorKind, ThreadExecutor};
pub use http::{SHARED_RUNTIME, block_on_with_timeout, http_client};
pub use logging::{IndicatifLogger, init_logging, resolve_level};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{Attempted, RetryPolicy, retry_fixed};
pub use semaphore::{Semaphore, SemaphoreGuard};
pub use shutdown::{install_signal_handlers, shutdown_flag};
pub use work_queue::WorkQueue;
