//! Checkpoint controller: merges batch outcomes into the dataset and decides
//! when to persist it.
//!
//! Flushes happen after every `save_interval`-th batch and once more at the
//! end of the run, so a crash loses at most `save_interval - 1` batches of
//! work. Failed items leave their record untouched; the next run selects them
//! again.

use std::path::{Path, PathBuf};

use newsenrich_store::{Dataset, RecordId, StoreError};

use crate::scheduler::BatchOutcomes;

/// Per-batch merge tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub failed_ids: Vec<RecordId>,
}

#[derive(Debug)]
pub struct Checkpoint {
    destination: PathBuf,
    save_interval: usize,
    flushes: usize,
}

impl Checkpoint {
    pub fn new(destination: impl Into<PathBuf>, save_interval: usize) -> Self {
        Self {
            destination: destination.into(),
            save_interval: save_interval.max(1),
            flushes: 0,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Successful flushes so far
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Write every successful payload of `batch` into its record.
    pub fn merge(&self, batch: &BatchOutcomes, dataset: &mut Dataset) -> MergeCounts {
        let mut counts = MergeCounts::default();
        for outcome in &batch.outcomes {
            let id = outcome.record_id;
            debug_assert!(!dataset.has_result(id), "record {id} selected twice");

            let written = match &outcome.result {
                Ok(payload) => payload
                    .to_json()
                    .map_err(|e| e.to_string())
                    .and_then(|json| dataset.set_result(id, json).map_err(|e| e.to_string())),
                Err(e) => Err(e.to_string()),
            };
            match written {
                Ok(()) => counts.succeeded += 1,
                Err(reason) => {
                    log::debug!("record {id}: not enriched ({reason})");
                    counts.failed += 1;
                    counts.failed_ids.push(id);
                }
            }
        }
        counts
    }

    /// Flush if `batch_index` (1-based) lands on the save interval.
    ///
    /// Returns whether a flush happened.
    pub fn maybe_flush(&mut self, batch_index: usize, dataset: &Dataset) -> Result<bool, StoreError> {
        if batch_index % self.save_interval != 0 {
            return Ok(false);
        }
        self.flush(dataset)?;
        log::info!(
            "Checkpoint after batch {batch_index}: {} enriched records saved to {}",
            dataset.enriched_count(),
            self.destination.display()
        );
        Ok(true)
    }

    /// Unconditional end-of-run flush.
    pub fn finish(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        self.flush(dataset)?;
        log::info!("Final save: {}", self.destination.display());
        Ok(())
    }

    fn flush(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        dataset.flush(&self.destination)?;
        self.flushes += 1;
        Ok(())
    }
}
