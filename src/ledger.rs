//! Durable record of which assets have already been posted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The posted-asset ledger: a JSON map of asset id to the time a posting
/// run recorded it.
///
/// Assets are marked after their batch has been through the publish stage,
/// whether or not individual targets succeeded, so an asset is attempted at
/// most once. The in-memory map is authoritative for the duration of a run;
/// [`flush`](PostLedger::flush) makes it durable.
#[derive(Debug)]
pub struct PostLedger {
    path: PathBuf,
    entries: HashMap<String, DateTime<Utc>>,
}

impl PostLedger {
    /// Load the ledger from disk. A missing file is an empty ledger. A file
    /// that exists but does not parse is an error: treating it as empty
    /// would repost the entire pool.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: HashMap::new(),
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read ledger file: {}", path.display()))?;
        let entries = serde_json::from_str(&content)
            .with_context(|| format!("Ledger file is corrupt: {}", path.display()))?;

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an asset id has already been posted.
    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record asset ids as posted at `at`. Ids already present keep their
    /// original timestamp. Returns the number of new entries.
    pub fn mark_many<I, S>(&mut self, ids: I, at: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for id in ids {
            if let std::collections::hash_map::Entry::Vacant(entry) = self.entries.entry(id.into())
            {
                entry.insert(at);
                added += 1;
            }
        }
        added
    }

    /// Write the ledger to disk through a temp file in the same directory,
    /// so a crash mid-write leaves the previous version intact.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create ledger directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to write ledger temp file: {}", temp_path.display()))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace ledger file: {}", self.path.display()))?;

        Ok(())
    }
}
