//! Main runner for the enrichment pipeline

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use newsenrich_core::{
    AsyncExecutor, BoundedExecutor, ExecutorKind, SharedProgress, ThreadExecutor, fmt_num, shutdown_flag,
};
use newsenrich_llm::Enricher;
use newsenrich_store::Dataset;

use crate::checkpoint::Checkpoint;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::scheduler::{BatchOutcomes, Scheduler};
use crate::selector::{WorkItem, select, survey};
use crate::stats::{BatchStats, RunSummary};

/// Run one enrichment pass, stopping early if a shutdown signal arrives.
pub fn run(
    config: &PipelineConfig,
    enricher: Arc<dyn Enricher>,
    progress: &SharedProgress,
) -> Result<RunSummary, PipelineError> {
    run_until(config, enricher, progress, shutdown_flag())
}

/// Run one enrichment pass, polling `stop` between batches.
///
/// Load failures return before anything is written. A failed checkpoint
/// aborts the run without a final save; otherwise the dataset is always
/// saved once more at the end, including after an interruption.
pub fn run_until(
    config: &PipelineConfig,
    enricher: Arc<dyn Enricher>,
    progress: &SharedProgress,
    stop: &'static AtomicBool,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    let start = Instant::now();

    log::info!("Loading dataset from {}", config.input.display());
    let stage = progress.stage_line("load");
    stage.set_message(config.input.display().to_string());
    let loaded = Dataset::load(&config.input, &config.columns);
    stage.finish_and_clear();
    let mut dataset = loaded.map_err(PipelineError::Load)?;

    let selection = survey(&dataset, config.min_text_length);
    log::info!(
        "{} records: {} already enriched, {} without text, {} too short, {} eligible",
        fmt_num(selection.total),
        fmt_num(selection.already_enriched),
        fmt_num(selection.missing_text),
        fmt_num(selection.too_short),
        fmt_num(selection.eligible)
    );
    let work: Vec<WorkItem> = select(&dataset, config.min_text_length).collect();

    let mut summary = RunSummary::new(config.method, selection);
    let mut checkpoint = Checkpoint::new(config.destination(), config.save_interval);

    let executor_error = |message: String| PipelineError::Executor {
        kind: config.method,
        message,
    };
    match config.method {
        ExecutorKind::Thread => {
            let executor = ThreadExecutor::new(config.concurrency).map_err(|e| executor_error(e.to_string()))?;
            let scheduler = Scheduler::new(executor, enricher, config).with_stop_flag(stop);
            drive(&scheduler, work, &mut dataset, &mut checkpoint, progress, &mut summary)?;
        }
        ExecutorKind::Async => {
            let executor = AsyncExecutor::new(config.concurrency).map_err(|e| executor_error(e.to_string()))?;
            let scheduler = Scheduler::new(executor, enricher, config).with_stop_flag(stop);
            drive(&scheduler, work, &mut dataset, &mut checkpoint, progress, &mut summary)?;
        }
    }

    let stage = progress.stage_line("save");
    stage.set_message(checkpoint.destination().display().to_string());
    let saved = checkpoint.finish(&dataset);
    stage.finish_and_clear();
    saved.map_err(PipelineError::Persistence)?;
    summary.flushes = checkpoint.flushes();
    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Schedule all work, merging and checkpointing after every batch.
fn drive<E: BoundedExecutor>(
    scheduler: &Scheduler<E>,
    work: Vec<WorkItem>,
    dataset: &mut Dataset,
    checkpoint: &mut Checkpoint,
    progress: &SharedProgress,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    if work.is_empty() {
        log::info!("Nothing to enrich");
        return Ok(());
    }
    log::info!(
        "Enriching {} records in {} batches ({} executor, {} concurrent)",
        fmt_num(work.len()),
        scheduler.batch_count(work.len()),
        scheduler.executor().name(),
        scheduler.executor().limit()
    );

    let pb = progress.item_bar("enrich", work.len() as u64);
    let result = scheduler.run(work, |batch: BatchOutcomes| {
        let merged = checkpoint.merge(&batch, dataset);
        let flushed = checkpoint
            .maybe_flush(batch.index, dataset)
            .map_err(PipelineError::Persistence)?;
        let stats = BatchStats::new(&batch, &merged, flushed);

        pb.inc(batch.outcomes.len() as u64);
        if !progress.is_tty() {
            stats.log();
        }
        summary.add_batch(&stats, merged);
        pb.set_message(summary.progress_message());
        Ok(())
    });
    pb.finish_and_clear();

    let report = result?;
    summary.total_batches = report.total_batches;
    summary.interrupted = report.interrupted;
    Ok(())
}
