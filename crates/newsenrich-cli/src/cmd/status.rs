//! `newsenrich status` - show how much of a dataset is enriched

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use newsenrich_core::fmt_num;
use newsenrich_pipeline::survey;
use newsenrich_store::Dataset;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Dataset CSV (default: [dataset] path from config)
    pub dataset: Option<PathBuf>,

    /// Skip texts with at most this many characters
    #[arg(long)]
    pub min_text_length: Option<usize>,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let mut pipeline = config.pipeline_config()?;
    if let Some(dataset) = args.dataset {
        pipeline.input = dataset;
    }
    if let Some(v) = args.min_text_length {
        pipeline.min_text_length = v;
    }

    let dataset = Dataset::load(&pipeline.input, &pipeline.columns)
        .with_context(|| format!("failed to load {}", pipeline.input.display()))?;
    let stats = survey(&dataset, pipeline.min_text_length);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(pipeline.input.display()).fg(Color::Cyan),
            Cell::new("Records").fg(Color::Cyan),
        ]);
    table.add_row(vec![Cell::new("Total"), Cell::new(fmt_num(stats.total))]);
    table.add_row(vec![
        Cell::new("Enriched").fg(Color::Green),
        Cell::new(fmt_num(stats.already_enriched)).fg(Color::Green),
    ]);
    table.add_row(vec![Cell::new("No text"), Cell::new(fmt_num(stats.missing_text))]);
    table.add_row(vec![
        Cell::new(format!("Too short (<= {} chars)", pipeline.min_text_length)),
        Cell::new(fmt_num(stats.too_short)),
    ]);
    table.add_row(vec![
        Cell::new("Pending").fg(Color::Yellow),
        Cell::new(format!(
            "{} ({} batches of {})",
            fmt_num(stats.eligible),
            stats.eligible.div_ceil(pipeline.batch_size.max(1)),
            pipeline.batch_size
        ))
        .fg(Color::Yellow),
    ]);

    eprintln!("\n{table}");
    Ok(())
}
