//! First-seen timestamps per event, so RSS publish dates survive regeneration.
//!
//! Assumes one run at a time per store file; nothing here locks it.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::EventRecord;
use crate::utils;

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    pubdates: BTreeMap<String, DateTime<FixedOffset>>,
}

pub struct PublishDateStore {
    path: PathBuf,
    pubdates: BTreeMap<String, DateTime<FixedOffset>>,
}

impl PublishDateStore {
    /// Never fails: a missing, unreadable or corrupt file starts an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pubdates = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StoreFile>(&contents) {
                Ok(file) if file.version == FORMAT_VERSION => file.pubdates,
                Ok(file) => {
                    warn!(path = %path.display(), version = file.version, "unknown store version, starting fresh");
                    BTreeMap::new()
                }
                Err(err) => {
                    warn!(path = %path.display(), "corrupt publish date store, starting fresh: {err}");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), "unreadable publish date store, starting fresh: {err}");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = pubdates.len(), "loaded publish dates");
        Self { path, pubdates }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.pubdates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pubdates.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<DateTime<FixedOffset>> {
        self.pubdates.get(url).copied()
    }

    /// Recorded date for `event`, or `now` recorded as its first sighting.
    pub fn get_or_assign(
        &mut self,
        event: &EventRecord,
        now: DateTime<FixedOffset>,
    ) -> DateTime<FixedOffset> {
        *self.pubdates.entry(event.url.clone()).or_insert_with(|| {
            debug!(url = %event.url, "first sighting");
            now
        })
    }

    /// Replaces the file atomically: a crash mid-write leaves the previous contents.
    pub fn save(&self) -> Result<()> {
        utils::ensure_parent(&self.path)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = StoreFile {
            version: FORMAT_VERSION,
            pubdates: self.pubdates.clone(),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &file)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}
