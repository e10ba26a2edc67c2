//! newsenrich-pipeline: batch enrichment of a news dataset
//!
//! Flow of one run:
//! 1. Load the dataset and select pending records, newest first
//! 2. Split them into batches; run each batch with bounded concurrency
//! 3. Merge successful payloads, checkpoint every N batches
//! 4. Save once more at the end
//!
//! Records that fail stay pending and are picked up by the next run.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod selector;
pub mod stats;

pub use checkpoint::{Checkpoint, MergeCounts};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use runner::{run, run_until};
pub use scheduler::{BatchOutcomes, EnrichmentOutcome, ScheduleReport, Scheduler};
pub use selector::{SelectionStats, WorkItem, select, survey};
pub use stats::{BatchStats, RunSummary};
