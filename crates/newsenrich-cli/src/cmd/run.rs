//! `newsenrich run` - enrich pending records of a dataset

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use newsenrich_core::{ExecutorKind, SharedProgress};
use newsenrich_llm::ChatEnricher;
use newsenrich_pipeline::PipelineConfig;

use crate::config::Config;

/// Exit status after a stop request
const INTERRUPTED: u8 = 130;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dataset CSV (default: [dataset] path from config)
    pub dataset: Option<PathBuf>,

    /// Write checkpoints here instead of rewriting the dataset
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Records per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Save after every N batches
    #[arg(short, long)]
    pub save_interval: Option<usize>,

    /// Maximum concurrent service calls
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Concurrency provider
    #[arg(short, long, value_enum)]
    pub method: Option<Method>,

    /// Skip texts with at most this many characters
    #[arg(long)]
    pub min_text_length: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum Method {
    Async,
    Thread,
}

impl From<Method> for ExecutorKind {
    fn from(m: Method) -> Self {
        match m {
            Method::Async => ExecutorKind::Async,
            Method::Thread => ExecutorKind::Thread,
        }
    }
}

impl RunArgs {
    /// Layer CLI flags over file settings.
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(dataset) = self.dataset {
            config.input = dataset;
        }
        config.output = self.output.or(config.output.take());
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.save_interval {
            config.save_interval = v;
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }
        if let Some(m) = self.method {
            config.method = m.into();
        }
        if let Some(v) = self.min_text_length {
            config.min_text_length = v;
        }
    }
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let mut pipeline = config.pipeline_config()?;
    args.apply(&mut pipeline);

    log::info!("Enriching {}", pipeline.input.display());
    log::info!("  Output: {}", pipeline.destination().display());
    log::info!(
        "  Batch size {}, save every {} batches, {} concurrent ({})",
        pipeline.batch_size,
        pipeline.save_interval,
        pipeline.concurrency,
        pipeline.method
    );

    let enricher = Arc::new(ChatEnricher::new(config.chat_config()?));
    log::debug!("Service endpoint: {}", enricher.endpoint());

    let summary = newsenrich_pipeline::run(&pipeline, enricher, progress)?;

    if progress.is_tty() {
        progress.println(summary.format_table());
        if !summary.failed_ids.is_empty() {
            progress.println(format!(
                "Failed records (retried next run): {}",
                summary.failed_id_list()
            ));
        }
    } else {
        summary.log();
    }

    if summary.interrupted {
        log::warn!("Interrupted; rerun to continue where this run stopped");
        return Ok(ExitCode::from(INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
