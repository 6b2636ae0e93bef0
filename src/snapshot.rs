//! Date-keyed JSON snapshots.
//!
//! Layout under the data root:
//! - `trending/<YYYY-MM-DD>.json`  raw fetch, before dedup/filter
//! - `processed/<YYYY-MM-DD>.json` final selection (dedup history input)
//! - `runs/<YYYY-MM-DD>.json`      run manifest
//!
//! One file per `(kind, date)`. Writing again replaces it atomically.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::ingest::types::TrendingItem;
use crate::pipeline::RunManifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Raw,
    Processed,
}

impl SnapshotKind {
    fn dir_name(self) -> &'static str {
        match self {
            SnapshotKind::Raw => "trending",
            SnapshotKind::Processed => "processed",
        }
    }

    fn label(self) -> &'static str {
        match self {
            SnapshotKind::Raw => "raw snapshot",
            SnapshotKind::Processed => "processed snapshot",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSnapshot {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<TrendingItem>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, kind: SnapshotKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    pub fn path_for(&self, kind: SnapshotKind, date: NaiveDate) -> PathBuf {
        self.dir(kind).join(file_name(date))
    }

    /// Create every directory the store writes into.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.dir(SnapshotKind::Raw),
            self.dir(SnapshotKind::Processed),
            self.runs_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| PipelineError::Workspace {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn write_snapshot(
        &self,
        date: NaiveDate,
        kind: SnapshotKind,
        items: &[TrendingItem],
        timestamp: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let snap = RunSnapshot {
            date,
            timestamp,
            count: items.len(),
            items: items.to_vec(),
        };
        let path = self.path_for(kind, date);
        write_json_atomic(&path, &snap).map_err(|source| PipelineError::Snapshot {
            what: kind.label(),
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), count = snap.count, kind = kind.label(), "snapshot written");
        Ok(path)
    }

    pub fn read_snapshot(&self, kind: SnapshotKind, date: NaiveDate) -> Option<RunSnapshot> {
        read_json(&self.path_for(kind, date))
    }

    /// Processed snapshots no older than `max_age_days` relative to `today`,
    /// oldest first. Bad file names and unparsable files are skipped.
    pub fn read_recent_snapshots(&self, max_age_days: u32, today: NaiveDate) -> Vec<RunSnapshot> {
        self.recent_processed(max_age_days, today)
            .into_iter()
            .filter_map(|(_, path)| {
                let snap = read_json::<RunSnapshot>(&path);
                if snap.is_none() {
                    tracing::debug!(path = %path.display(), "unreadable snapshot skipped");
                }
                snap
            })
            .collect()
    }

    /// Titles from recent processed snapshots, optionally ignoring one date
    /// (the run's own date, so a re-run does not dedup against itself).
    ///
    /// Only `items[].title` is read; other fields may be in any shape. The
    /// date comes from the file name.
    pub fn history_titles(
        &self,
        max_age_days: u32,
        today: NaiveDate,
        exclude: Option<NaiveDate>,
    ) -> BTreeSet<String> {
        self.recent_processed(max_age_days, today)
            .into_iter()
            .filter(|(date, _)| Some(*date) != exclude)
            .flat_map(|(_, path)| {
                let titles = read_json::<serde_json::Value>(&path).map(|v| item_titles(&v));
                if titles.is_none() {
                    tracing::debug!(path = %path.display(), "unreadable snapshot skipped");
                }
                titles.unwrap_or_default()
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Dated processed snapshot files within the window, oldest first.
    fn recent_processed(&self, max_age_days: u32, today: NaiveDate) -> Vec<(NaiveDate, PathBuf)> {
        let Ok(entries) = fs::read_dir(self.dir(SnapshotKind::Processed)) else {
            return Vec::new();
        };

        let mut dated: Vec<(NaiveDate, PathBuf)> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .filter_map(|p| {
                let stem = p.file_stem()?.to_str()?;
                let date = NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()?;
                Some((date, p))
            })
            .filter(|(date, _)| (today - *date).num_days() <= i64::from(max_age_days))
            .collect();
        dated.sort();
        dated
    }

    /// Run manifest at `runs/<date>.json`; a later run of the same date replaces it.
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        let path = self.runs_dir().join(file_name(manifest.date));
        write_json_atomic(&path, manifest).map_err(|source| PipelineError::Snapshot {
            what: "run manifest",
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn read_manifest(&self, date: NaiveDate) -> Option<RunManifest> {
        read_json(&self.runs_dir().join(file_name(date)))
    }
}

fn file_name(date: NaiveDate) -> String {
    format!("{}.json", date.format("%Y-%m-%d"))
}

fn item_titles(v: &serde_json::Value) -> Vec<String> {
    v.get("items")
        .and_then(|items| items.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|it| it.get("title")?.as_str())
                .map(|t| t.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let s = fs::read_to_string(path).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    f.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
