//! # CLI Module
//!
//! Command-line interface for the near-duplicate image finder.
//!
//! ## Usage
//! ```bash
//! # Fingerprint some images and report duplicates across the store
//! dupehunter a.jpg b.png c.gif
//!
//! # Stricter threshold
//! dupehunter ~/Photos/*.jpg -d 6
//!
//! # Paths from stdin, one per line
//! find ~/Photos -type f | dupehunter -
//!
//! # JSON output
//! dupehunter ~/Photos/*.png --output json
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use dupehunter::core::detector::{PairEvaluation, DEFAULT_THRESHOLD};
use dupehunter::core::pipeline::{Pipeline, PipelineResult};
use dupehunter::core::pool::DEFAULT_WORKERS;
use dupehunter::core::store::{default_store_dir, open_store, FingerprintStore};
use dupehunter::error::{DupeHunterError, Result};
use dupehunter::events::{Event, EventChannel, IngestEvent, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// dupehunter - Find near-duplicate images without touching them
#[derive(Parser, Debug)]
#[command(name = "dupehunter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Image files to ingest, or a single `-` to read paths from stdin
    paths: Vec<PathBuf>,

    /// Hamming distance below which two images are duplicates
    #[arg(short = 'd', long = "distance", default_value_t = DEFAULT_THRESHOLD)]
    distance: u32,

    /// Log every step, including every evaluated pair
    #[arg(short, long)]
    verbose: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Data directory for the fingerprint store
    #[arg(long)]
    db: Option<PathBuf>,

    /// Number of concurrent ingestion workers
    #[arg(short = 'j', long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (flagged paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dupehunter::init_tracing(cli.verbose) {
        // No subscriber to report through
        eprintln!("error: {e}");
        return Err(e);
    }

    let paths = resolve_inputs(cli.paths.clone())?;

    let store_dir = match cli.db.clone() {
        Some(dir) => dir,
        None => default_store_dir()?,
    };
    let store: Arc<dyn FingerprintStore> = Arc::new(open_store(&store_dir)?);

    let result = run_pipeline(&cli, &paths, Arc::clone(&store));

    // Flush and release the store whether or not the run succeeded
    let closed = store.sync_all().and_then(|()| store.close());
    let result = result?;
    closed?;

    match cli.output {
        OutputFormat::Pretty => print_pretty_results(&Term::stdout(), &result, cli.verbose),
        OutputFormat::Json => print_json_results(&result, cli.verbose)?,
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    Ok(())
}

/// Expand a lone `-` into the lines of stdin. Blank lines are ignored.
fn resolve_inputs(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if paths.len() != 1 || paths[0].as_os_str() != "-" {
        return Ok(paths);
    }

    let mut resolved = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.map_err(|e| DupeHunterError::Config(format!("failed to read stdin: {e}")))?;
        let line = line.trim();
        if !line.is_empty() {
            resolved.push(PathBuf::from(line));
        }
    }
    Ok(resolved)
}

fn run_pipeline(
    cli: &Cli,
    paths: &[PathBuf],
    store: Arc<dyn FingerprintStore>,
) -> Result<PipelineResult> {
    let pretty = matches!(cli.output, OutputFormat::Pretty);

    if pretty {
        let term = Term::stdout();
        term.write_line(&format!(
            "{} {}",
            style("dupehunter").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = Pipeline::builder()
        .store(store)
        .workers(cli.workers)
        .threshold(cli.distance)
        .keep_evaluations(cli.verbose)
        .build()?;

    let (sender, receiver) = EventChannel::new();

    // Progress bar only when logs are not already streaming to the terminal
    let progress = if pretty && !cli.verbose {
        let pb = ProgressBar::new(paths.len() as u64);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| DupeHunterError::Config(e.to_string()))?
            .progress_chars("█▓░");
        pb.set_style(bar_style);
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Ingest(IngestEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(paths, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    result
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    let ingest = &result.ingest;
    let report = &result.report;

    term.write_line(&format!("{} Run Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files processed in {:.1}s",
        style(ingest.processed).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} ingested, {} skipped, {} failed",
        style(ingest.ingested.len()).green(),
        style(ingest.skipped).dim(),
        style(ingest.failed).red()
    ))
    .ok();
    term.write_line(&format!(
        "  {} fingerprints in store",
        style(report.total_records).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} images flagged (distance < {})",
        style(report.flagged.len()).yellow(),
        report.threshold
    ))
    .ok();
    term.write_line("").ok();

    if report.flagged.is_empty() {
        term.write_line(&format!("  {} No duplicates found!", style("✓").green()))
            .ok();
    } else {
        term.write_line(&format!("{}", style("Duplicate Pairs:").bold().underlined()))
            .ok();
        for pair in &report.duplicates {
            term.write_line(&format!(
                "  {} {} {} {}",
                style(format!("[{:>2}]", pair.distance)).yellow(),
                display_path(&pair.outer),
                style("~").dim(),
                display_path(&pair.inner)
            ))
            .ok();
        }
        term.write_line("").ok();

        term.write_line(&format!("{}", style("Flagged:").bold().underlined()))
            .ok();
        for path in &report.flagged {
            term.write_line(&format!("  {} {}", style("○").dim(), display_path(path)))
                .ok();
        }
        term.write_line("").ok();
    }

    if verbose && !report.evaluations.is_empty() {
        term.write_line(&format!("{}", style("Evaluated Pairs:").bold().underlined()))
            .ok();
        for pair in &report.evaluations {
            term.write_line(&format!(
                "  {:>2} {} {}",
                pair.distance,
                pair.outer.display(),
                pair.inner.display()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    for failure in ingest.failures() {
        if let dupehunter::core::TaskOutcome::Failed { reason } = &failure.outcome {
            term.write_line(&format!(
                "  {} {}",
                style("✗").red(),
                style(reason).dim()
            ))
            .ok();
        }
    }

    // Footer
    term.write_line(&format!(
        "{}",
        style("Remember: No files were modified. Review carefully before taking action.").dim()
    ))
    .ok();
}

fn display_path(path: &std::path::Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

fn print_json_results(result: &PipelineResult, verbose: bool) -> Result<()> {
    let report = &result.report;
    let evaluations: &[PairEvaluation] = if verbose { &report.evaluations } else { &[] };
    let flagged: Vec<String> = report
        .flagged
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let output = serde_json::json!({
        "processed": result.ingest.processed,
        "ingested": result.ingest.ingested.len(),
        "skipped": result.ingest.skipped,
        "failed": result.ingest.failed,
        "threshold": report.threshold,
        "total_records": report.total_records,
        "duration_ms": result.duration_ms,
        "flagged": flagged,
        "duplicates": report.duplicates,
        "evaluations": evaluations,
    });

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| DupeHunterError::Config(format!("failed to render JSON: {e}")))?;
    println!("{}", json);
    Ok(())
}

fn print_minimal_results(result: &PipelineResult) {
    for path in &result.report.flagged {
        println!("{}", path.display());
    }
}
