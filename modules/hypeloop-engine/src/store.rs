//! Durable projection of the acted-on set and the daily stats.
//!
//! Two JSON records on disk, written independently. Loads never fail the
//! caller: any read or parse error logs and yields empty defaults. Saves log
//! and swallow errors — in-memory state stays authoritative for the rest of
//! the run. Each record is written to a temp file and atomically renamed
//! into place, so a crash mid-write cannot corrupt a record; a crash between
//! the two writes can still leave them mutually out of step, which the load
//! path tolerates.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::dedup::RepliedLog;
use crate::quota::DayStats;

const REPLIED_FILE: &str = "replied_targets.json";
const STATS_FILE: &str = "daily_stats.json";

#[derive(Serialize, Deserialize)]
struct RepliedRecord {
    ids: Vec<String>,
    last_updated: DateTime<Utc>,
}

pub struct StateStore {
    replied_path: PathBuf,
    stats_path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(data_dir) {
            warn!(dir = %data_dir.display(), error = %e, "Could not create data directory");
        }
        Self {
            replied_path: data_dir.join(REPLIED_FILE),
            stats_path: data_dir.join(STATS_FILE),
        }
    }

    /// Load both records. Never fails: missing or unreadable records come
    /// back as empty defaults.
    pub fn load(&self) -> (HashSet<String>, BTreeMap<String, DayStats>) {
        let ids = match read_record::<RepliedRecord>(&self.replied_path) {
            Ok(Some(record)) => {
                info!(count = record.ids.len(), "Loaded acted-on targets");
                record.ids.into_iter().collect()
            }
            Ok(None) => HashSet::new(),
            Err(e) => {
                warn!(path = %self.replied_path.display(), error = %e, "Failed to load acted-on targets, starting empty");
                HashSet::new()
            }
        };

        let days = match read_record::<BTreeMap<String, DayStats>>(&self.stats_path) {
            Ok(Some(days)) => days,
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(path = %self.stats_path.display(), error = %e, "Failed to load daily stats, starting empty");
                BTreeMap::new()
            }
        };

        (ids, days)
    }

    /// Overwrite both records. Errors are logged and swallowed.
    pub fn save(&self, replied: &RepliedLog, days: &BTreeMap<String, DayStats>) {
        let record = RepliedRecord {
            ids: replied.ids().map(String::from).collect(),
            last_updated: Utc::now(),
        };
        if let Err(e) = write_record(&self.replied_path, &record) {
            warn!(path = %self.replied_path.display(), error = %e, "Failed to save acted-on targets");
        }
        if let Err(e) = write_record(&self.stats_path, days) {
            warn!(path = %self.stats_path.display(), error = %e, "Failed to save daily stats");
        }
    }
}

fn read_record<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

/// Write-to-temp-then-rename so a crash mid-write never clobbers the record.
fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().context("record path has no parent")?;
    let mut tmp = NamedTempFile::new_in(dir).context("create temp file")?;
    serde_json::to_writer_pretty(&mut tmp, value).context("serialize record")?;
    tmp.flush().context("flush record")?;
    tmp.persist(path)
        .with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}
