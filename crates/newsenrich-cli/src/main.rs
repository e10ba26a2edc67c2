//! newsenrich - batch enrichment of news datasets
//!
//! Sends each pending news post of a CSV dataset to an LLM service and stores
//! the structured reply (content type, entities, hashtags, subject) next to
//! the text, checkpointing as it goes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "newsenrich")]
#[command(about = "Batch LLM enrichment of news datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./newsenrich.toml or ~/.config/newsenrich/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Enrich pending records of a dataset
    Run(cmd::run::RunArgs),
    /// Show enrichment progress of a dataset without calling the service
    Status(cmd::status::StatusArgs),
    /// Time a single enrichment call, or compare executors on a sample
    Probe(cmd::probe::ProbeArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Progress context (TTY auto-detect)
    let progress = Arc::new(newsenrich_core::ProgressContext::new());

    // Logging:
    //   TTY:     warn unless configured or --debug (progress bars show activity)
    //   non-TTY: info unless configured or --quiet/--debug
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let configured = config
        .logging
        .level
        .as_deref()
        .or(if is_tty { Some("warn") } else { None });
    let level = newsenrich_core::resolve_level(cli.quiet, cli.debug, configured);
    newsenrich_core::init_logging(&level, multi);

    if let Err(e) = newsenrich_core::install_signal_handlers() {
        log::warn!("Cannot install signal handlers, Ctrl-C will not checkpoint: {e}");
    }

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Status(args) => cmd::status::run(args, &config).map(|()| ExitCode::SUCCESS),
        Command::Probe(args) => cmd::probe::run(args, &config, &progress).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            print_config(&config, cli.config.as_deref());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config, explicit: Option<&std::path::Path>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let source = match explicit {
        Some(path) => path.display().to_string(),
        None => config::user_config_path()
            .map(|p| format!("./newsenrich.toml or {}", p.display()))
            .unwrap_or_else(|| "./newsenrich.toml".to_string()),
    };
    let p = &config.pipeline;
    let rows: Vec<(&str, String)> = vec![
        ("Config file", source),
        ("Dataset", config.dataset.path.display().to_string()),
        (
            "Columns",
            format!("text={} result={}", config.dataset.text_column, config.dataset.result_column),
        ),
        ("Batch size", p.batch_size.to_string()),
        ("Save interval", format!("{} batches", p.save_interval)),
        ("Concurrency", format!("{} ({})", p.concurrency, p.method)),
        ("Pacing", format!("{}ms", p.pacing_ms)),
        ("Max retries", format!("{} (delay {}ms)", p.max_retries, p.retry_delay_ms)),
        ("Min text length", format!("{} chars", p.min_text_length)),
        ("LLM base URL", config.llm.base_url.clone()),
        ("LLM model", config.llm.model.clone()),
        (
            "LLM API key",
            if config.llm.api_key.is_some() { "configured" } else { "not set" }.to_string(),
        ),
        ("LLM timeout", format!("{}s", config.llm.timeout_secs)),
        (
            "Log level",
            config.logging.level.clone().unwrap_or_else(|| "default".to_string()),
        ),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }

    eprintln!("\n{table}");
}
