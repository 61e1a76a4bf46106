// src/store/records.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::data::{Record, Resource};
use crate::error::{ParseError, ServiceError, StoreError};
use crate::file::{read_optional, write_atomic};

/// One complete, validated set of records. Never mutated after construction.
#[derive(Debug)]
pub struct Snapshot {
    year: u32,
    refreshed_at: DateTime<Utc>,
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

/// On-disk shape of a snapshot.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    year: u32,
    refreshed_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl Snapshot {
    /// Check the snapshot invariants: non-empty, valid fields, unique keys, one year.
    pub fn build(mut records: Vec<Record>, refreshed_at: DateTime<Utc>) -> Result<Self, ParseError> {
        let year = match records.first() {
            Some(r) => r.year,
            None => return Err(ParseError::Inconsistent(s!("no records"))),
        };
        records.sort_by(|a, b| a.rank_position.cmp(&b.rank_position).then_with(|| a.key.cmp(&b.key)));

        let mut index = HashMap::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            if !r.is_valid() {
                return Err(ParseError::Inconsistent(format!("invalid record for '{}'", r.key)));
            }
            if r.year != year {
                return Err(ParseError::Inconsistent(format!("mixed years {} and {}", year, r.year)));
            }
            if index.insert(r.key.clone(), i).is_some() {
                return Err(ParseError::Inconsistent(format!("duplicate key '{}'", r.key)));
            }
        }
        Ok(Self { year, refreshed_at, records, index })
    }

    pub fn year(&self) -> u32 { self.year }
    pub fn record_count(&self) -> usize { self.records.len() }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&i| &self.records[i])
    }
}

/// Key → record lookups over the latest committed snapshot.
///
/// Readers load the snapshot pointer once per call, so a concurrent
/// `replace_all` is observed either entirely or not at all.
pub struct RecordStore {
    current: ArcSwapOption<Snapshot>,
    path: PathBuf,
    writer: Mutex<()>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { current: ArcSwapOption::empty(), path: path.into(), writer: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_populated(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.current.load_full().map(|s| s.refreshed_at)
    }

    pub fn lookup(&self, key: Option<&str>) -> Result<Record, ServiceError> {
        let snap = self.current.load_full().ok_or(ServiceError::NotReady(Resource::Records))?;
        let key = key.map(str::trim).filter(|k| !k.is_empty()).ok_or(ServiceError::MissingKey)?;
        let key = key.to_ascii_uppercase();
        snap.get(&key).cloned().ok_or(ServiceError::NoEntry(key))
    }

    pub fn list_all(&self) -> Result<Vec<Record>, ServiceError> {
        let snap = self.current.load_full().ok_or(ServiceError::NotReady(Resource::Records))?;
        Ok(snap.records.clone())
    }

    /// Swap in a whole new record set. The old snapshot stays visible until the
    /// new one is fully built and validated; on error nothing changes.
    pub fn replace_all(&self, records: Vec<Record>) -> Result<Arc<Snapshot>, ParseError> {
        let _w = self.writer.lock();
        let snap = Arc::new(Snapshot::build(records, Utc::now())?);
        self.current.store(Some(Arc::clone(&snap)));
        logf!("Records: committed {} entries for {}", snap.record_count(), snap.year);
        Ok(snap)
    }

    /// Write the committed snapshot to disk. No-op when nothing is committed.
    pub fn persist(&self) -> Result<(), StoreError> {
        let _w = self.writer.lock();
        let Some(snap) = self.current.load_full() else { return Ok(()) };
        let file = SnapshotFile {
            year: snap.year,
            refreshed_at: snap.refreshed_at,
            records: snap.records.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| StoreError::Corrupt { path: self.path.clone(), reason: e.to_string() })?;
        write_atomic(&self.path, &bytes).map_err(|source| StoreError::Io { path: self.path.clone(), source })?;
        logd!("Records: wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    /// Load the persisted snapshot. `Ok(false)` when there is none yet.
    pub fn load_from_disk(&self) -> Result<bool, StoreError> {
        let _w = self.writer.lock();
        let Some(bytes) = read_optional(&self.path)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?
        else {
            logd!("Records: no snapshot at {}", self.path.display());
            return Ok(false);
        };

        let corrupt = |reason: String| StoreError::Corrupt { path: self.path.clone(), reason };
        let file: SnapshotFile = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if file.records.iter().any(|r| r.year != file.year) {
            return Err(corrupt(format!("records disagree with snapshot year {}", file.year)));
        }
        let snap = Snapshot::build(file.records, file.refreshed_at).map_err(|e| corrupt(e.to_string()))?;

        logf!("Records: loaded {} entries for {} from disk", snap.record_count(), snap.year);
        self.current.store(Some(Arc::new(snap)));
        Ok(true)
    }
}
