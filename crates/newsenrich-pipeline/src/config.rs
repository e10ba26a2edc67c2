//! Pipeline run configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use newsenrich_core::{ExecutorKind, RetryPolicy};
use newsenrich_store::Columns;

use crate::error::PipelineError;

/// Runtime configuration for one enrichment run.
///
/// Built once by the caller and handed to the scheduler and checkpoint
/// controller at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dataset to enrich
    pub input: PathBuf,
    /// Where checkpoints go; `None` rewrites `input` in place
    pub output: Option<PathBuf>,
    pub columns: Columns,
    /// Work items per batch (pacing and checkpoint unit)
    pub batch_size: usize,
    /// Flush every N batches
    pub save_interval: usize,
    /// Maximum enrichment calls in flight at once
    pub concurrency: usize,
    /// Sleep between two batches
    pub pacing_delay: Duration,
    /// Attempts per item, including the first
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Texts must be strictly longer than this (in characters)
    pub min_text_length: usize,
    pub method: ExecutorKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("telegram_messages.csv"),
            output: None,
            columns: Columns::default(),
            batch_size: 50,
            save_interval: 2,
            concurrency: 5,
            pacing_delay: Duration::from_millis(100),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            min_text_length: 100,
            method: ExecutorKind::Async,
        }
    }
}

impl PipelineConfig {
    /// Checkpoint destination
    pub fn destination(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.input)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("save_interval", self.save_interval),
            ("concurrency", self.concurrency),
            ("max_retries", self.max_retries as usize),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(PipelineError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.columns.text == self.columns.result {
            return Err(PipelineError::Config(format!(
                "text and result columns must differ (both {:?})",
                self.columns.text
            )));
        }
        Ok(())
    }
}
