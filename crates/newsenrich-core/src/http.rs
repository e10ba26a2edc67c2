//! Shared HTTP client and tokio runtime.
//!
//! Enrichment calls use async reqwest internally but present a sync interface,
//! so they can run on rayon workers and on the async executor's blocking pool
//! alike.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle connections kept per host; roughly the largest sensible concurrency limit
const POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime driving every outbound HTTP call.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("newsenrich-http")
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Run `fut` on the shared runtime with a deadline.
///
/// Blocks the calling thread. Returns `None` when the deadline elapses first;
/// the future is dropped, which aborts the underlying request.
pub fn block_on_with_timeout<F>(timeout: Duration, fut: F) -> Option<F::Output>
where
    F: std::future::Future,
{
    SHARED_RUNTIME
        .handle()
        .block_on(async { tokio::time::timeout(timeout, fut).await.ok() })
}
