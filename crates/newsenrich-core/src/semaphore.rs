//! Counting admission gate for outbound enrichment calls.
//!
//! Uses `Mutex + Condvar` from std. One gate is shared by every worker of a
//! run, so the limit holds across batches and across executor providers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A counting semaphore that limits concurrent access to a shared resource.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
    permits: usize,
}

/// RAII guard that releases one permit on drop.
pub struct SemaphoreGuard<'a>(&'a Semaphore);

impl Semaphore {
    /// Create a semaphore with `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cond: Condvar::new(),
            permits,
        }
    }

    // Poison is ignored: the counter is only mutated under the lock.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a permit is available, then acquire it.
    pub fn acquire(&self) -> SemaphoreGuard<'_> {
        let mut count = self.lock();
        while *count == 0 {
            count = self
                .cond
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
        SemaphoreGuard(self)
    }

    /// Total permits this gate was created with.
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.permits - *self.lock()
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        let mut count = self.0.lock();
        *count += 1;
        self.0.cond.notify_one();
    }
}
