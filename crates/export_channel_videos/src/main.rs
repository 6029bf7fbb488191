use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use yt_channel_core::{
    acquire_credential_blocking, export_videos_blocking, init_tracing, CommonArgs, ExportOptions,
    ExportResult, Scope, VideoRecord, FIELDNAMES,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Export the channel's uploads with like counts to CSV",
    long_about = None
)]
struct Cli {
    /// Only keep videos published in this year
    #[arg(short = 'y', long = "year", conflicts_with = "all_years")]
    year: Option<i32>,

    /// Ignore any year set in the config file
    #[arg(long = "all-years")]
    all_years: bool,

    /// Directory the CSV is written to
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);
    let config = cli.common.resolve().context("failed to load settings")?;

    let year_filter = if cli.all_years {
        None
    } else {
        cli.year.or(config.year_filter)
    };

    println!("{}", style("Authorizing read-only access...").cyan());
    let credential = acquire_credential_blocking(config.auth_options(Scope::ReadOnly))
        .context("authorization failed")?;

    match year_filter {
        Some(year) => println!("{} {year}", style("Listing uploads published in").cyan()),
        None => println!("{}", style("Listing all uploads...").cyan()),
    }
    let options = ExportOptions {
        output_dir: cli.output_dir.unwrap_or_else(|| config.output_dir.clone()),
        encoding: config.encoding.clone(),
        year_filter,
        client: config.client_options(),
    };
    let result = export_videos_blocking(options, &credential)
        .with_context(|| "failed to export the channel's videos")?;
    print_summary(&result);
    Ok(())
}

fn print_summary(result: &ExportResult) {
    if let Some(error) = &result.pagination_error {
        println!(
            "{} {error}",
            style("Listing stopped early, the file holds partial results:").yellow()
        );
    }
    if result.records.is_empty() {
        println!(
            "{} {}",
            style("No matching videos, header-only file written:").yellow(),
            result.csv_path.display()
        );
    } else {
        println!(
            "{} {} rows, output file: {}",
            style("Export complete,").green(),
            result.records.len(),
            result.csv_path.display()
        );
    }

    match &result.most_liked {
        Some(record) => {
            println!("{}", style("Most liked video:").green().bold());
            print!("{}", most_liked_block(record));
        }
        None => println!("{}", style("No video has a visible like count.").yellow()),
    }

    let summary = &result.summary;
    println!(
        "{} {} exported, {} without statistics, {} skipped",
        style("Summary:").dim(),
        summary.succeeded,
        summary.failed,
        summary.skipped
    );
    println!("{} {}", style("CSV header:").dim(), FIELDNAMES.join(", "));
}

fn most_liked_block(record: &VideoRecord) -> String {
    format!(
        "  Title: {}\n  ID:    {}\n  Likes: {}\n  URL:   {}\n",
        record.title,
        record.video_id,
        record.likes,
        record.url()
    )
}
