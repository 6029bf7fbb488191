use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use yt_channel_core::{
    acquire_credential_blocking, import_metadata_blocking, init_tracing, load_updates,
    CommonArgs, ImportOptions, ImportProgress, ImportResult, ProgressCallback, RowOutcome, Scope,
};

const DEFAULT_CSV: &str = "videos_to_update.csv";
const TITLE_PREVIEW_CHARS: usize = 50;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Apply corrected titles and descriptions from a CSV file",
    long_about = None
)]
struct Cli {
    /// CSV with title, video_id and description columns
    csv: Option<PathBuf>,

    /// Seconds to wait after each video
    #[arg(short = 'd', long = "delay")]
    delay: Option<f64>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);
    let mut config = cli.common.resolve().context("failed to load settings")?;
    if let Some(delay) = cli.delay {
        if !delay.is_finite() || delay < 0.0 {
            bail!("delay must be a non-negative number of seconds");
        }
        config.delay_secs = delay;
    }

    let csv_path = cli
        .csv
        .or_else(|| config.csv_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV));
    let options = ImportOptions {
        csv_path,
        encoding: config.encoding.clone(),
        delay: config.delay(),
        client: config.client_options(),
        progress_callback: Some(progress_printer()),
    };

    let parsed = load_updates(&options).context("failed to read the update list")?;
    if parsed.dropped > 0 {
        println!(
            "{} {} rows without a video id were ignored",
            style("Warning:").yellow(),
            parsed.dropped
        );
    }
    if parsed.rows.is_empty() {
        bail!(
            "no usable rows in {}, nothing to update",
            options.csv_path.display()
        );
    }
    println!(
        "{} {} videos to update",
        style("Loaded").cyan(),
        parsed.rows.len()
    );

    println!("{}", style("Authorizing write access...").cyan());
    let credential = acquire_credential_blocking(config.auth_options(Scope::ReadWrite))
        .context("authorization failed")?;

    let result = import_metadata_blocking(&options, &parsed.rows, &credential)
        .with_context(|| "failed to apply the updates")?;
    print_summary(&result, parsed.dropped, options.delay);
    Ok(())
}

fn progress_printer() -> ProgressCallback {
    Arc::new(|progress: ImportProgress| match &progress.outcome {
        None => println!(
            "{} {}/{}: id={}, new title='{}'",
            style("Processing").cyan(),
            progress.current,
            progress.total,
            progress.update.video_id,
            title_preview(&progress.update.title)
        ),
        Some(outcome @ RowOutcome::Updated { .. }) => {
            println!("  {} {outcome}", style("ok").green())
        }
        Some(outcome) => println!("  {} {outcome}", style("failed").red()),
    })
}

fn title_preview(title: &str) -> String {
    let mut chars = title.chars();
    let preview: String = chars.by_ref().take(TITLE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

fn print_summary(result: &ImportResult, dropped: usize, delay: Duration) {
    let summary = &result.summary;
    println!("{}", style("Update finished.").green().bold());
    println!("  Updated: {}", summary.succeeded);
    println!("  Failed:  {}", summary.failed);
    if dropped > 0 {
        println!("  Ignored rows: {dropped}");
    }
    let rate_limited = result.reports.iter().any(|report| {
        matches!(
            report.outcome,
            RowOutcome::UpdateFailed {
                rate_limited: true,
                ..
            }
        )
    });
    if rate_limited {
        println!(
            "{} some updates hit the API quota; rerun later or raise --delay (now {:.1}s)",
            style("Hint:").yellow(),
            delay.as_secs_f64()
        );
    }
}
