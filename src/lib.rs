pub mod calendar;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod scraping;
pub mod store;
mod utils;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use config::AppConfig;
use scraping::{Ai1ecExtractor, PageSource};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub new_publish_dates: usize,
}

/// One scrape: fetch, extract, then write the calendar and the feed.
///
/// Nothing is written when the fetch or the extraction fails. Only one run may use a
/// given store file at a time.
pub fn run(
    config: &AppConfig,
    source: &dyn PageSource,
    clock: &dyn Clock,
) -> anyhow::Result<RunSummary> {
    let now = clock.now();
    let zone = config.zone()?;
    let today = zone.local_time(now).date_naive();
    let extractor = Ai1ecExtractor::new(&config.selectors, &config.source_url, zone, today)?;

    info!(url = %config.source_url, "fetching event listing");
    let html = source
        .fetch(&config.source_url)
        .with_context(|| format!("unable to fetch {}", config.source_url))?;
    let events = extractor
        .extract(&html)
        .context("unable to extract events")?;
    if events.is_empty() {
        warn!(url = %config.source_url, "page contained no events");
    }
    info!(count = events.len(), "extracted events");

    calendar::output_calendar(&config.calendar, &events, zone, now).with_context(|| {
        format!("unable to write calendar {}", config.calendar.output.display())
    })?;
    info!(path = %config.calendar.output.display(), "wrote calendar");

    let new_publish_dates =
        feed::output_feed(&config.feed, &events, &config.store_path, zone.local_time(now))
            .with_context(|| format!("unable to write feed {}", config.feed.output.display()))?;
    info!(path = %config.feed.output.display(), "wrote feed");

    Ok(RunSummary {
        events: events.len(),
        new_publish_dates,
    })
}
