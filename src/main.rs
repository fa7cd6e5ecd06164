use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hcevents_lib::config::AppConfig;
use hcevents_lib::scraping::HttpSource;
use hcevents_lib::SystemClock;

/// Scrape hardcore.lt once and write the calendar and RSS files.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON config file; defaults to the user config dir when present
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("unable to load config")?;
    let source = HttpSource::from_config(&config)?;

    let summary = hcevents_lib::run(&config, &source, &SystemClock)?;
    tracing::info!(
        events = summary.events,
        new = summary.new_publish_dates,
        "done"
    );
    Ok(())
}
