//! `newsenrich probe` - time one enrichment call, or compare executors
//!
//! `--compare N` copies the first N records of the configured dataset into a
//! scratch directory, one copy per executor, and runs the full pipeline over
//! each copy. The dataset itself is never written.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use newsenrich_core::{ExecutorKind, SharedProgress, fmt_num, shutdown_flag};
use newsenrich_llm::{ChatEnricher, Enricher};
use newsenrich_pipeline::{PipelineConfig, RunSummary};
use newsenrich_store::Dataset;

use crate::config::Config;

const SAMPLE_TEXT: &str = "Gold prices hit $2,000 per ounce as investors seek safe haven assets amid \
economic uncertainty. The Federal Reserve's recent interest rate decisions have significantly \
impacted commodity markets, with steel and iron ore prices also showing volatility.";

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// News text to enrich (default: a built-in commodity market sample)
    pub text: Option<String>,

    /// Call deadline in seconds (default: [llm] timeout_secs)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Time both executors over the first N records of the dataset
    #[arg(long, value_name = "N", conflicts_with = "text")]
    pub compare: Option<usize>,
}

/// One executor's run over the sample.
#[derive(Debug)]
pub struct MethodTiming {
    pub method: ExecutorKind,
    pub summary: RunSummary,
}

pub fn run(args: ProbeArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut chat = config.chat_config()?;
    if let Some(secs) = args.timeout {
        ensure!(secs > 0, "--timeout must be at least 1 second");
        chat.timeout = Duration::from_secs(secs);
    }
    let enricher = ChatEnricher::new(chat);
    log::info!("Probing {}", enricher.endpoint());

    if let Some(rows) = args.compare {
        ensure!(rows > 0, "--compare needs at least one record");
        let base = config.pipeline_config()?;
        let timings = compare_methods(&base, rows, Arc::new(enricher), progress, shutdown_flag())?;
        progress.println(format_comparison(&timings));
        return Ok(());
    }

    let text = args.text.as_deref().unwrap_or(SAMPLE_TEXT);
    let start = Instant::now();
    let result = enricher.enrich(text);
    let elapsed = start.elapsed();

    let payload = result.with_context(|| format!("enrichment failed after {:.2}s", elapsed.as_secs_f64()))?;
    eprintln!("Single call: {:.2}s", elapsed.as_secs_f64());
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Run the pipeline over the first `rows` records once per executor.
///
/// Each executor gets its own scratch copy, so the second run sees the same
/// pending records as the first. The sample goes out as a single batch with
/// a checkpoint after it. Stops early if `stop` is raised.
pub fn compare_methods(
    base: &PipelineConfig,
    rows: usize,
    enricher: Arc<dyn Enricher>,
    progress: &SharedProgress,
    stop: &'static AtomicBool,
) -> Result<Vec<MethodTiming>> {
    let mut sample = Dataset::load(&base.input, &base.columns)
        .with_context(|| format!("Failed to load {}", base.input.display()))?;
    sample.truncate(rows);
    let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;

    let mut timings = Vec::with_capacity(ExecutorKind::ALL.len());
    for method in ExecutorKind::ALL {
        let input = scratch.path().join(format!("{method}.csv"));
        sample.flush(&input)?;
        let config = PipelineConfig {
            input,
            output: None,
            batch_size: rows,
            save_interval: 1,
            method,
            ..base.clone()
        };

        log::info!("Timing {method} executor on {} records", fmt_num(sample.len()));
        let summary = newsenrich_pipeline::run_until(&config, Arc::clone(&enricher), progress, stop)?;
        log::info!("{method}: {:.2}s", summary.elapsed.as_secs_f64());
        let interrupted = summary.interrupted;
        timings.push(MethodTiming { method, summary });
        if interrupted {
            break;
        }
    }
    Ok(timings)
}

/// Table of per-executor timings plus a speedup line when both ran.
pub fn format_comparison(timings: &[MethodTiming]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Method").fg(Color::Cyan),
            Cell::new("Eligible").fg(Color::Cyan),
            Cell::new("Enriched").fg(Color::Cyan),
            Cell::new("Failed").fg(Color::Cyan),
            Cell::new("Time").fg(Color::Cyan),
        ]);
    for t in timings {
        table.add_row(vec![
            Cell::new(t.method),
            Cell::new(fmt_num(t.summary.selection.eligible)),
            Cell::new(fmt_num(t.summary.succeeded)),
            Cell::new(fmt_num(t.summary.failed)),
            Cell::new(format!("{:.2}s", t.summary.elapsed.as_secs_f64())),
        ]);
    }

    let mut out = format!("\n{table}");
    if let [a, b] = timings {
        let (fast, slow) = if a.summary.elapsed <= b.summary.elapsed { (a, b) } else { (b, a) };
        let fast_secs = fast.summary.elapsed.as_secs_f64();
        if fast_secs > 0.0 {
            out.push_str(&format!(
                "\n{} was {:.2}x faster than {}",
                fast.method,
                slow.summary.elapsed.as_secs_f64() / fast_secs,
                slow.method
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsenrich_core::ProgressContext;
    use newsenrich_llm::{ContentType, EnrichmentError, Payload};
    use newsenrich_store::Columns;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEVER: AtomicBool = AtomicBool::new(false);

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Enricher for Counting {
        fn enrich(&self, _text: &str) -> Result<Payload, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Payload::new(ContentType::Commodity))
        }
    }

    fn timing(method: ExecutorKind, millis: u64) -> MethodTiming {
        MethodTiming {
            method,
            summary: RunSummary {
                method,
                elapsed: Duration::from_millis(millis),
                ..Default::default()
            },
        }
    }

    #[test]
    fn compare_runs_each_method_on_its_own_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("posts.csv");
        let rows: String = (0..5).map(|i| format!("{i},post number {i} about steel\n")).collect();
        let original = format!("id,text\n{rows}");
        std::fs::write(&input, &original).unwrap();

        let base = PipelineConfig {
            input: input.clone(),
            min_text_length: 0,
            pacing_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            concurrency: 2,
            ..Default::default()
        };
        let enricher = Arc::new(Counting::default());
        let progress = Arc::new(ProgressContext::hidden());

        let timings = compare_methods(&base, 3, enricher.clone(), &progress, &NEVER).unwrap();

        let methods: Vec<_> = timings.iter().map(|t| t.method).collect();
        assert_eq!(methods, ExecutorKind::ALL);
        for t in &timings {
            assert_eq!(t.summary.selection.total, 3);
            assert_eq!(t.summary.succeeded, 3);
            assert_eq!(t.summary.batches_run, 1);
        }
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 6);

        // Source dataset untouched
        assert_eq!(std::fs::read_to_string(&input).unwrap(), original);
        let reloaded = Dataset::load(&input, &Columns::default()).unwrap();
        assert_eq!(reloaded.enriched_count(), 0);
    }

    #[test]
    fn compare_reports_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let base = PipelineConfig {
            input: dir.path().join("absent.csv"),
            ..Default::default()
        };
        let progress = Arc::new(ProgressContext::hidden());
        let err = compare_methods(&base, 2, Arc::new(Counting::default()), &progress, &NEVER).unwrap_err();
        assert!(err.to_string().contains("absent.csv"));
    }

    #[test]
    fn comparison_names_faster_method() {
        let out = format_comparison(&[timing(ExecutorKind::Thread, 3000), timing(ExecutorKind::Async, 1000)]);
        assert!(out.contains("thread"));
        assert!(out.contains("3.00s"));
        assert!(out.contains("async was 3.00x faster than thread"));
    }

    #[test]
    fn single_method_has_no_speedup_line() {
        let out = format_comparison(&[timing(ExecutorKind::Thread, 500)]);
        assert!(!out.contains("faster"));
    }
}
