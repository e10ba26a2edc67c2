use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use newsenrich_core::{ExecutorKind, ProgressContext, SharedProgress, ThreadExecutor};
use newsenrich_llm::{ContentType, EnrichmentError, Enricher, Payload};
use newsenrich_pipeline::{Checkpoint, PipelineConfig, PipelineError, Scheduler, run_until, select};
use newsenrich_store::{Columns, Dataset};
use tempfile::TempDir;

static NEVER: AtomicBool = AtomicBool::new(false);

/// Succeeds for every text and counts calls.
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

impl Enricher for Counting {
    fn enrich(&self, _text: &str) -> Result<Payload, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Payload::new(ContentType::News))
    }
}

/// Fails every call.
#[derive(Default)]
struct Failing {
    calls: AtomicUsize,
}

impl Enricher for Failing {
    fn enrich(&self, _text: &str) -> Result<Payload, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EnrichmentError::service("503 Service Unavailable"))
    }
}

/// Sleeps inside the call and records the highest number of overlapping calls.
#[derive(Default)]
struct Overlap {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Enricher for Overlap {
    fn enrich(&self, _text: &str) -> Result<Payload, EnrichmentError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Payload::new(ContentType::Industry))
    }
}

fn text(len: usize) -> String {
    "n".repeat(len)
}

/// Write a dataset with an `id` column ahead of `text` and `result`.
fn write_dataset(dir: &Path, rows: &[(String, &str)]) -> PathBuf {
    let path = dir.join("messages.csv");
    let mut csv = String::from("id,text,result\n");
    for (i, (text, result)) in rows.iter().enumerate() {
        csv.push_str(&format!("m{i},\"{text}\",\"{}\"\n", result.replace('"', "\"\"")));
    }
    std::fs::write(&path, csv).unwrap();
    path
}

fn config(input: PathBuf) -> PipelineConfig {
    PipelineConfig {
        input,
        pacing_delay: Duration::ZERO,
        retry_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn progress() -> SharedProgress {
    Arc::new(ProgressContext::hidden())
}

fn reload(path: &Path) -> Dataset {
    Dataset::load(path, &Columns::default()).unwrap()
}

#[test]
fn enriches_long_texts_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), &[(text(150), ""), (text(50), ""), (text(200), "")]);
    let cfg = config(input.clone());

    let enricher = Arc::new(Counting::default());
    let summary = run_until(&cfg, enricher.clone(), &progress(), &NEVER).unwrap();
    assert_eq!(enricher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.selection.too_short, 1);

    let ds = reload(&input);
    assert!(ds.has_result(0));
    assert!(!ds.has_result(1));
    assert!(ds.has_result(2));
    let payload = Payload::parse(ds.result(2).unwrap()).unwrap();
    assert_eq!(payload.type_of_content, ContentType::News);
    assert_eq!(ds.headers(), ["id", "text", "result"]);

    let raw = std::fs::read(&input).unwrap();
    assert!(raw.starts_with(b"\xEF\xBB\xBF"), "saved file should carry a BOM");

    // Second pass finds nothing to do
    let again = Arc::new(Counting::default());
    let summary = run_until(&cfg, again.clone(), &progress(), &NEVER).unwrap();
    assert_eq!(again.calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.selection.already_enriched, 2);
    assert_eq!(reload(&input).enriched_count(), 2);
}

#[test]
fn existing_results_are_left_alone() {
    let dir = TempDir::new().unwrap();
    let prior = r#"{"type_of_content":"macro","entities":{},"hashtags":[],"subject":"Rates"}"#;
    let input = write_dataset(dir.path(), &[(text(300), prior), (text(300), "")]);

    let enricher = Arc::new(Counting::default());
    run_until(&config(input.clone()), enricher.clone(), &progress(), &NEVER).unwrap();

    assert_eq!(enricher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(reload(&input).result(0), Some(prior));
}

#[test]
fn separate_output_leaves_input_untouched() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), &[(text(150), "")]);
    let before = std::fs::read(&input).unwrap();
    let output = dir.path().join("enriched.csv");
    let cfg = PipelineConfig {
        output: Some(output.clone()),
        ..config(input.clone())
    };

    run_until(&cfg, Arc::new(Counting::default()), &progress(), &NEVER).unwrap();

    assert_eq!(std::fs::read(&input).unwrap(), before);
    assert_eq!(reload(&output).enriched_count(), 1);
}

#[test]
fn failing_items_use_every_attempt_and_stay_pending() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), &[(text(150), ""), (text(150), "")]);
    let cfg = PipelineConfig {
        max_retries: 3,
        ..config(input.clone())
    };

    let enricher = Arc::new(Failing::default());
    let summary = run_until(&cfg, enricher.clone(), &progress(), &NEVER).unwrap();

    assert_eq!(enricher.calls.load(Ordering::SeqCst), 6);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failed_ids, vec![1, 0]);
    assert_eq!(summary.retries, 4);

    let ds = reload(&input);
    assert_eq!(ds.enriched_count(), 0);
    assert_eq!(select(&ds, cfg.min_text_length).count(), 2);
}

#[test]
fn crash_before_final_save_loses_at_most_interval_minus_one_batches() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(String, &str)> = (0..7).map(|_| (text(150), "")).collect();
    let input = write_dataset(dir.path(), &rows);
    let cfg = PipelineConfig {
        batch_size: 1,
        save_interval: 3,
        concurrency: 1,
        ..config(input.clone())
    };

    let mut dataset = reload(&input);
    let work = select(&dataset, cfg.min_text_length).collect();
    let scheduler = Scheduler::new(ThreadExecutor::new(1).unwrap(), Arc::new(Counting::default()), &cfg)
        .with_stop_flag(&NEVER);
    let mut checkpoint = Checkpoint::new(&input, cfg.save_interval);

    let report = scheduler
        .run(work, |batch| {
            checkpoint.merge(&batch, &mut dataset);
            checkpoint.maybe_flush(batch.index, &dataset).map(|_| ())
        })
        .unwrap();
    assert_eq!(report.batches_run, 7);
    assert_eq!(dataset.enriched_count(), 7);
    // Process dies here, before the final save

    let on_disk = reload(&input);
    assert_eq!(checkpoint.flushes(), 2);
    assert_eq!(on_disk.enriched_count(), 6);
    // Newest-first: only the oldest record's batch is lost
    assert!(!on_disk.has_result(0));
}

#[test]
fn concurrency_is_bounded_for_both_executors() {
    for method in [ExecutorKind::Thread, ExecutorKind::Async] {
        let dir = TempDir::new().unwrap();
        let rows: Vec<(String, &str)> = (0..12).map(|_| (text(150), "")).collect();
        let input = write_dataset(dir.path(), &rows);
        let cfg = PipelineConfig {
            method,
            concurrency: 3,
            batch_size: 6,
            ..config(input.clone())
        };

        let enricher = Arc::new(Overlap::default());
        let summary = run_until(&cfg, enricher.clone(), &progress(), &NEVER).unwrap();

        assert_eq!(summary.succeeded, 12, "{method}");
        assert_eq!(summary.batches_run, 2, "{method}");
        let peak = enricher.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "{method}: peak {peak}");
    }
}

#[test]
fn failed_checkpoint_is_fatal() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(String, &str)> = (0..3).map(|_| (text(150), "")).collect();
    let input = write_dataset(dir.path(), &rows);
    let output = dir.path().join("no-such-dir").join("out.csv");
    let cfg = PipelineConfig {
        output: Some(output.clone()),
        batch_size: 1,
        save_interval: 1,
        concurrency: 1,
        ..config(input)
    };

    let enricher = Arc::new(Counting::default());
    let err = run_until(&cfg, enricher.clone(), &progress(), &NEVER).unwrap_err();

    assert!(matches!(err, PipelineError::Persistence(_)), "{err}");
    assert_eq!(enricher.calls.load(Ordering::SeqCst), 1);
    assert!(!output.exists());
}

#[test]
fn missing_dataset_is_load_error() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path().join("absent.csv"));
    let err = run_until(&cfg, Arc::new(Counting::default()), &progress(), &NEVER).unwrap_err();
    assert!(matches!(err, PipelineError::Load(_)));
    assert!(!dir.path().join("absent.csv").exists());
}

#[test]
fn stop_request_finishes_batch_and_saves() {
    static STOP: AtomicBool = AtomicBool::new(false);

    /// Requests a stop on its first call.
    struct StopAfterFirst;
    impl Enricher for StopAfterFirst {
        fn enrich(&self, _text: &str) -> Result<Payload, EnrichmentError> {
            STOP.store(true, Ordering::SeqCst);
            Ok(Payload::new(ContentType::Commodity))
        }
    }

    let dir = TempDir::new().unwrap();
    let rows: Vec<(String, &str)> = (0..6).map(|_| (text(150), "")).collect();
    let input = write_dataset(dir.path(), &rows);
    let cfg = PipelineConfig {
        batch_size: 2,
        save_interval: 10,
        concurrency: 1,
        ..config(input.clone())
    };

    let summary = run_until(&cfg, Arc::new(StopAfterFirst), &progress(), &STOP).unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.batches_run, 1);
    assert_eq!(summary.total_batches, 3);
    assert_eq!(summary.flushes, 1);
    assert_eq!(reload(&input).enriched_count(), 2);
}
