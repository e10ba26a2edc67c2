//! Batch scheduler
//!
//! Splits pending work into fixed-size batches and runs each batch to
//! completion on a [`BoundedExecutor`] before starting the next one. Every
//! enrichment call passes through one shared admission gate, so at most
//! `concurrency` calls are in flight at any instant, whatever the executor.
//!
//! Between batches the scheduler sleeps for the pacing delay and polls the
//! stop flag. A batch that has started always runs to the end.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use newsenrich_core::{Attempted, BoundedExecutor, RetryPolicy, Semaphore, retry_fixed, shutdown_flag};
use newsenrich_llm::{EnrichmentError, Enricher, Payload};
use newsenrich_store::RecordId;

use crate::config::PipelineConfig;
use crate::selector::WorkItem;

/// Final outcome of one work item after retries.
#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub record_id: RecordId,
    pub result: Result<Payload, EnrichmentError>,
    /// Calls made for this item, including the first
    pub attempts: u32,
}

/// Everything one completed batch produced, in dispatch order.
#[derive(Debug)]
pub struct BatchOutcomes {
    /// 1-based
    pub index: usize,
    pub total_batches: usize,
    pub outcomes: Vec<EnrichmentOutcome>,
    pub elapsed: Duration,
}

impl BatchOutcomes {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// What the scheduler did, independent of merge results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub batches_run: usize,
    pub total_batches: usize,
    /// Stop flag observed before all batches ran
    pub interrupted: bool,
}

pub struct Scheduler<E: BoundedExecutor> {
    executor: E,
    enricher: Arc<dyn Enricher>,
    gate: Arc<Semaphore>,
    retry: RetryPolicy,
    batch_size: usize,
    pacing_delay: Duration,
    stop: &'static AtomicBool,
}

impl<E: BoundedExecutor> Scheduler<E> {
    pub fn new(executor: E, enricher: Arc<dyn Enricher>, config: &PipelineConfig) -> Self {
        Self {
            executor,
            enricher,
            gate: Arc::new(Semaphore::new(config.concurrency.max(1))),
            retry: config.retry_policy(),
            batch_size: config.batch_size.max(1),
            pacing_delay: config.pacing_delay,
            stop: shutdown_flag(),
        }
    }

    /// Poll `stop` instead of the process-wide shutdown flag.
    pub fn with_stop_flag(mut self, stop: &'static AtomicBool) -> Self {
        self.stop = stop;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Number of batches `items` work items split into.
    pub fn batch_count(&self, items: usize) -> usize {
        items.div_ceil(self.batch_size)
    }

    /// Process `work` batch by batch.
    ///
    /// `on_batch` runs on the calling thread after each batch completes and
    /// before the next one is dispatched, so it may mutate the dataset
    /// freely. An error from it stops the run immediately.
    pub fn run<Err>(
        &self,
        work: Vec<WorkItem>,
        mut on_batch: impl FnMut(BatchOutcomes) -> Result<(), Err>,
    ) -> Result<ScheduleReport, Err> {
        let mut report = ScheduleReport {
            total_batches: self.batch_count(work.len()),
            ..Default::default()
        };
        let mut items = work.into_iter().peekable();

        while items.peek().is_some() {
            if report.batches_run > 0 && !self.pacing_delay.is_zero() {
                std::thread::sleep(self.pacing_delay);
            }
            if self.stop.load(Ordering::Relaxed) {
                log::warn!(
                    "Stop requested, leaving {} of {} batches unprocessed",
                    report.total_batches - report.batches_run,
                    report.total_batches
                );
                report.interrupted = true;
                break;
            }

            let index = report.batches_run + 1;
            let start = Instant::now();
            let tasks: Vec<_> = items
                .by_ref()
                .take(self.batch_size)
                .map(|item| self.task(item))
                .collect();
            log::debug!(
                "Batch {index}/{}: dispatching {} items ({} executor, {} permits)",
                report.total_batches,
                tasks.len(),
                self.executor.name(),
                self.gate.permits()
            );
            let outcomes = self.executor.run_all(tasks);
            debug_assert_eq!(self.gate.in_flight(), 0, "batch closed with calls still in flight");

            on_batch(BatchOutcomes {
                index,
                total_batches: report.total_batches,
                outcomes,
                elapsed: start.elapsed(),
            })?;
            report.batches_run = index;
        }

        Ok(report)
    }

    /// One item's unit of work: retries with the gate held only during calls.
    fn task(&self, item: WorkItem) -> impl FnOnce() -> EnrichmentOutcome + Send + 'static {
        let enricher = Arc::clone(&self.enricher);
        let gate = Arc::clone(&self.gate);
        let retry = self.retry;
        move || {
            let label = format!("record {}", item.record_id);
            let Attempted { result, attempts } = retry_fixed(&label, retry, || {
                let _permit = gate.acquire();
                enricher.enrich(&item.text)
            });
            EnrichmentOutcome {
                record_id: item.record_id,
                result,
                attempts,
            }
        }
    }
}
