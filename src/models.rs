use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One listing scraped from the events page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventRecord {
    pub title: String,
    pub url: String, // identity key for the lifetime of the feed
    pub time: DateTime<FixedOffset>,
    pub description_html: String,
    pub description_text: String, // ends with the url on its own line
}

impl EventRecord {
    /// `YYYY-MM-DD` of the start, in the zone the time was scraped in.
    pub fn date_label(&self) -> String {
        self.time.format("%Y-%m-%d").to_string()
    }

    pub fn date_time_label(&self) -> String {
        self.time.format("%Y-%m-%d %H:%M").to_string()
    }
}
