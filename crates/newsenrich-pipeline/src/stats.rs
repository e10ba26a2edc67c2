//! Run statistics and reporting.
//!
//! - Batch-level: [`BatchStats`], logged in non-TTY mode
//! - Run-level: [`RunSummary`], printed as a table at the end

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use newsenrich_core::{ExecutorKind, fmt_num};
use newsenrich_store::RecordId;

use crate::checkpoint::MergeCounts;
use crate::scheduler::BatchOutcomes;
use crate::selector::SelectionStats;

/// Failed ids listed in the summary before truncating
const MAX_LISTED_FAILURES: usize = 20;

/// One batch after merging.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// 1-based
    pub index: usize,
    pub total_batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Extra attempts spent on retries
    pub retries: u32,
    pub flushed: bool,
    pub elapsed: Duration,
}

impl BatchStats {
    /// Counts come from the merge, so a payload that could not be stored
    /// is a failure here too.
    pub fn new(batch: &BatchOutcomes, merged: &MergeCounts, flushed: bool) -> Self {
        Self {
            index: batch.index,
            total_batches: batch.total_batches,
            succeeded: merged.succeeded,
            failed: merged.failed,
            retries: batch.outcomes.iter().map(|o| o.attempts.saturating_sub(1)).sum(),
            flushed,
            elapsed: batch.elapsed,
        }
    }

    /// Log batch completion (non-TTY mode only).
    pub fn log(&self) {
        log::info!(
            "batch {}/{}: {} ok, {} failed, {} retries{} [{:.1}s]",
            self.index,
            self.total_batches,
            self.succeeded,
            self.failed,
            self.retries,
            if self.flushed { ", saved" } else { "" },
            self.elapsed.as_secs_f64()
        );
    }
}

/// Aggregated statistics for one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub method: ExecutorKind,
    pub selection: SelectionStats,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_ids: Vec<RecordId>,
    pub retries: u32,
    pub batches_run: usize,
    pub total_batches: usize,
    pub flushes: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(method: ExecutorKind, selection: SelectionStats) -> Self {
        Self {
            method,
            selection,
            ..Default::default()
        }
    }

    /// Fold one merged batch into the totals.
    pub fn add_batch(&mut self, stats: &BatchStats, merged: MergeCounts) {
        self.processed += stats.succeeded + stats.failed;
        self.succeeded += merged.succeeded;
        self.failed += merged.failed;
        self.failed_ids.extend(merged.failed_ids);
        self.retries += stats.retries;
        self.batches_run = stats.index;
    }

    /// Short running tally for the progress bar.
    pub fn progress_message(&self) -> String {
        format!(
            "{} processed, {} failed, {} skipped",
            fmt_num(self.processed),
            fmt_num(self.failed),
            fmt_num(self.selection.skipped())
        )
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Enrichment")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
            ]);

        let s = &self.selection;
        let rows: [(&str, String); 6] = [
            ("Records", fmt_num(s.total)),
            ("Already enriched", fmt_num(s.already_enriched)),
            ("No text", fmt_num(s.missing_text)),
            ("Too short", fmt_num(s.too_short)),
            ("Eligible", fmt_num(s.eligible)),
            (
                "Batches",
                format!("{}/{} ({} executor)", self.batches_run, self.total_batches, self.method),
            ),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
        table.add_row(vec![
            Cell::new("Enriched").fg(Color::Green),
            Cell::new(fmt_num(self.succeeded)).fg(Color::Green),
        ]);
        let failed_color = if self.failed > 0 { Color::Red } else { Color::Reset };
        table.add_row(vec![
            Cell::new("Failed").fg(failed_color),
            Cell::new(fmt_num(self.failed)).fg(failed_color),
        ]);
        table.add_row(vec![Cell::new("Retries"), Cell::new(self.retries)]);
        table.add_row(vec![Cell::new("Checkpoints"), Cell::new(self.flushes)]);
        table.add_row(vec![
            Cell::new("Elapsed"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]);
        if self.interrupted {
            table.add_row(vec![
                Cell::new("Interrupted").fg(Color::Yellow),
                Cell::new("yes").fg(Color::Yellow),
            ]);
        }

        format!("\n{table}")
    }

    /// Comma-separated failed ids, truncated for display.
    pub fn failed_id_list(&self) -> String {
        let mut list = self
            .failed_ids
            .iter()
            .take(MAX_LISTED_FAILURES)
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.failed_ids.len() > MAX_LISTED_FAILURES {
            list.push_str(&format!(" (+{} more)", self.failed_ids.len() - MAX_LISTED_FAILURES));
        }
        list
    }

    /// Log minimal summary (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "Enrichment {}: {} enriched, {} failed, {} batches [{:.1}s]",
            if self.interrupted { "interrupted" } else { "complete" },
            fmt_num(self.succeeded),
            fmt_num(self.failed),
            self.batches_run,
            self.elapsed.as_secs_f64()
        );
        if !self.failed_ids.is_empty() {
            log::warn!("Failed records (retried next run): {}", self.failed_id_list());
        }
    }
}
