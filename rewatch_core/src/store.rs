// src/store.rs
//
// File-backed deduplicating merge store for watch-history records. The
// backing artifact is a pretty-printed JSON array so it stays greppable by
// hand; merge is overwrite-by-url, never a blind append.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::HistoryError;
use crate::record::VideoRecord;

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted collection. A missing artifact is an empty history;
    /// an unparsable one is reported and treated as empty rather than
    /// blocking the pipeline.
    pub fn load(&self) -> Result<Vec<VideoRecord>, HistoryError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(records) => Ok(records),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "store artifact is unparsable; starting from an empty history"
                    );
                    Ok(Vec::new())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge a batch into the persisted collection by `url`, last write wins.
    /// Returns the full merged collection sorted by `watch_timestamp`
    /// descending. Does not persist; see [`merge_and_persist`](Self::merge_and_persist).
    pub fn merge(&mut self, batch: Vec<VideoRecord>) -> Result<Vec<VideoRecord>, HistoryError> {
        let existing = self.load()?;
        Ok(merge_records(existing, batch))
    }

    /// Atomically rewrite the backing artifact. The new content goes to a
    /// sibling temp file first and is renamed over the target, so a failure
    /// mid-write leaves the previously persisted artifact intact.
    pub fn persist(&mut self, records: &[VideoRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| HistoryError::Persist(format!("{}: {e}", parent.display())))?;
            }
        }

        let body = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| HistoryError::Persist(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| HistoryError::Persist(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }

    pub fn merge_and_persist(
        &mut self,
        batch: Vec<VideoRecord>,
    ) -> Result<Vec<VideoRecord>, HistoryError> {
        let merged = self.merge(batch)?;
        self.persist(&merged)?;
        Ok(merged)
    }
}

/// Overwrite-by-key merge: the incoming batch always takes precedence over
/// the existing collection because the agent's most recent observation is
/// authoritative. Ties on `watch_timestamp` order by `url` so the result is
/// deterministic.
pub fn merge_records(
    existing: Vec<VideoRecord>,
    batch: Vec<VideoRecord>,
) -> Vec<VideoRecord> {
    let mut by_url: HashMap<String, VideoRecord> = existing
        .into_iter()
        .map(|record| (record.url.clone(), record))
        .collect();

    for record in batch {
        by_url.insert(record.url.clone(), record);
    }

    let mut merged: Vec<VideoRecord> = by_url.into_values().collect();
    merged.sort_by(|a, b| {
        b.watch_timestamp
            .cmp(&a.watch_timestamp)
            .then_with(|| a.url.cmp(&b.url))
    });
    merged
}
