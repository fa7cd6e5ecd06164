use std::{fs, path::Path, path::PathBuf};

use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source_url: String,
    /// IANA zone name; the system zone when unset.
    pub timezone: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
    pub store_path: PathBuf,
    pub selectors: Selectors,
    pub calendar: CalendarConfig,
    pub feed: FeedConfig,
}

/// CSS selectors locating the parts of an event listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub container: String,
    /// Direct child of `container` holding the link; later siblings are the description.
    pub date_item: String,
    pub link: String,
    pub time_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub name: String,
    pub prodid: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub title: String,
    pub link: String,
    pub description: String,
    pub output: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_url: "http://hardcore.lt".to_string(),
            timezone: None,
            request_timeout_secs: None,
            user_agent: "hcevents/0.1 (+http://wemakethings.net/hcevents/)".to_string(),
            store_path: utils::store_path(),
            selectors: Selectors::default(),
            calendar: CalendarConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            container: "ol.ai1ec-date-events".to_string(),
            date_item: "li.ai1ec-date".to_string(),
            link: "a".to_string(),
            time_label: "span.ai1ec-event-time".to_string(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            name: "Vilnius Hardcore events".to_string(),
            prodid: "-//hcevents//wemakethings.net//".to_string(),
            output: PathBuf::from("hcevents.ics"),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: "Vilnius Hardcore events".to_string(),
            link: "http://wemakethings.net/hcevents/".to_string(),
            description: String::new(),
            output: PathBuf::from("hcevents.xml"),
        }
    }
}

impl AppConfig {
    /// Reads `path` strictly, or the default config file leniently when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => read_config(path),
            None => {
                let path = utils::config_path();
                if !path.exists() {
                    return Ok(Self::default());
                }
                Ok(read_config(&path).unwrap_or_else(|err| {
                    warn!(path = %path.display(), "ignoring unreadable config: {err}");
                    Self::default()
                }))
            }
        }
    }

    pub fn zone(&self) -> Result<Zone> {
        match self.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(Zone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(Zone::Named)
                .map_err(|_| AppError::Timezone(name.to_string())),
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Zone that naive page times are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    Local,
    Named(Tz),
}

impl Zone {
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Zone::Local => to_zone_datetime(&Local, naive),
            Zone::Named(tz) => to_zone_datetime(tz, naive),
        }
    }

    pub fn local_time(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Zone::Local => instant.with_timezone(&Local).fixed_offset(),
            Zone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }
}

/// Earliest instant for ambiguous local times; `None` inside a DST gap.
fn to_zone_datetime<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.fixed_offset()),
        LocalResult::Ambiguous(dt, _) => Some(dt.fixed_offset()),
        LocalResult::None => None,
    }
}
