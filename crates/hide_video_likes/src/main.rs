use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use yt_channel_core::{
    acquire_credential_blocking, init_tracing, probe_hide_likes, CommonArgs, ProbeOptions,
    ProbeResult, Scope, UNSUPPORTED_REASON,
};

const DEFAULT_CSV: &str = "videos_hide_likes.csv";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Check which videos could have their like count hidden",
    long_about = "Reads video ids from a CSV file and reports, for each one, that the \
                  YouTube Data API offers no way to hide like counts. Nothing is changed; \
                  use YouTube Studio to hide them by hand."
)]
struct Cli {
    /// CSV with a video_id column
    csv: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);
    let config = cli.common.resolve().context("failed to load settings")?;

    println!(
        "{} {}.",
        style("Note:").yellow().bold(),
        UNSUPPORTED_REASON
    );
    println!(
        "{}",
        style("No video will be modified. Hide like counts in YouTube Studio instead.").yellow()
    );

    let options = ProbeOptions {
        csv_path: cli
            .csv
            .or_else(|| config.csv_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV)),
        encoding: config.encoding.clone(),
    };
    let result = probe_hide_likes(&options).context("failed to read the video list")?;
    if result.reports.is_empty() {
        bail!(
            "no video ids found in {}, nothing to check",
            options.csv_path.display()
        );
    }

    println!("{}", style("Authorizing write access...").cyan());
    acquire_credential_blocking(config.auth_options(Scope::ReadWrite))
        .context("authorization failed")?;

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &ProbeResult) {
    let total = result.reports.len();
    for (index, report) in result.reports.iter().enumerate() {
        println!(
            "{} {}/{}: id={} ({})",
            style("Skipped").yellow(),
            index + 1,
            total,
            report.video_id,
            report.reason
        );
    }
    println!("{}", style("Check finished.").green().bold());
    println!("  Updated: 0");
    println!("  Skipped: {}", result.summary.skipped);
    if result.dropped_rows > 0 {
        println!("  Ignored rows: {}", result.dropped_rows);
    }
}
