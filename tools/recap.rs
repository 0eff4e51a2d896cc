/// Recap — writes the recap page for a team's game.
///
/// Usage: recap --config recap.ron [--date YYYY-MM-DD] [--feed-dir DIR] [--output DIR] [--dry-run]

use chrono::{NaiveDate, Utc};
use clap::Parser;
use recap_engine::config::{FeedConfig, RecapConfig};
use recap_engine::core::pipeline::{RecapError, RecapPipeline};
use recap_engine::publish::TextPublisher;
use std::path::PathBuf;
use std::process;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Fact-locked game recaps from play-by-play feeds", long_about = None)]
#[command(version)]
struct Cli {
    /// RON configuration file
    #[arg(short, long, env = "RECAP_CONFIG", default_value = "recap.ron")]
    config: PathBuf,

    /// Game date (defaults to yesterday in the team's time zone)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Read saved stats documents from this directory instead of the configured feed
    #[arg(long)]
    feed_dir: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the recap as text instead of writing the page
    #[arg(long)]
    dry_run: bool,

    /// Override the narrator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RecapError> {
    let mut config = RecapConfig::load(&cli.config)?;
    if let Some(dir) = cli.feed_dir {
        config.feed = FeedConfig::Files { dir };
    }
    if let Some(dir) = cli.output {
        config.output.dir = dir;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let mut builder = RecapPipeline::builder(config);
    if cli.dry_run {
        builder = builder.publisher(TextPublisher::stdout());
    }
    let mut pipeline = builder.build()?;

    let outcome = match cli.date {
        Some(date) => pipeline.run(date)?,
        None => pipeline.run_for_yesterday(Utc::now())?,
    };

    let summary = outcome.summary();
    tracing::info!(outcome = summary.outcome, "{}", summary.detail);
    Ok(())
}
