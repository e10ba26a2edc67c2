//! Pending-work selection
//!
//! A record is eligible when its text is present, strictly longer than the
//! minimum length (in characters), and it has no result yet. Records are
//! offered newest-first, i.e. in reverse dataset order, so a time-boxed run
//! covers the most recent posts.

use newsenrich_store::{Dataset, RecordId};

/// One record selected for processing, detached from the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub record_id: RecordId,
    pub text: String,
}

/// Lazily yield eligible records in reverse dataset order.
///
/// Re-running after results are merged naturally skips completed records.
pub fn select(dataset: &Dataset, min_text_length: usize) -> impl Iterator<Item = WorkItem> + '_ {
    dataset.texts().rev().filter_map(move |(id, text)| {
        let text = text?;
        (is_long_enough(text, min_text_length) && !dataset.has_result(id)).then(|| WorkItem {
            record_id: id,
            text: text.to_string(),
        })
    })
}

fn is_long_enough(text: &str, min_text_length: usize) -> bool {
    text.chars().count() > min_text_length
}

/// Why each record is or is not offered to the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub total: usize,
    pub already_enriched: usize,
    pub missing_text: usize,
    pub too_short: usize,
    pub eligible: usize,
}

impl SelectionStats {
    /// Records the run will not touch
    pub fn skipped(&self) -> usize {
        self.total - self.eligible
    }
}

/// Classify every record without building work items.
pub fn survey(dataset: &Dataset, min_text_length: usize) -> SelectionStats {
    let mut stats = SelectionStats {
        total: dataset.len(),
        ..Default::default()
    };
    for (id, text) in dataset.texts() {
        match text {
            _ if dataset.has_result(id) => stats.already_enriched += 1,
            None => stats.missing_text += 1,
            Some(t) if !is_long_enough(t, min_text_length) => stats.too_short += 1,
            Some(_) => stats.eligible += 1,
        }
    }
    stats
}
