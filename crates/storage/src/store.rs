// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplicating flat-file store
//!
//! Records land in `{root}/markets/{sport}/{competition}/{day}/records.json`,
//! one pretty-printed JSON array per destination. New records merge into the
//! existing array without duplicating identity keys, under a per-file
//! advisory lock held on a sibling `records.lock`. Concurrent processes
//! writing the same destination serialize on that lock.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use ovr_core::HarvestRecord;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

const KIND_DIR: &str = "markets";
const DATA_FILE: &str = "records.json";
const LOCK_FILE: &str = "records.lock";
const IDENTITY_KEY: &str = "id";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Errors from a single destination write. [`FileStore::save`] consumes
/// these internally; a failed destination is dropped for that call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lock timeout after {0:?}")]
    LockTimeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thread-safe flat-file storage for harvest records.
///
/// Holds no state between calls; every `save` resolves destinations fresh
/// and leaves no data file open.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Persist records, grouped by destination file.
    ///
    /// Returns the number of records actually written. Records whose
    /// identity key is already present in their destination are skipped;
    /// a destination whose lock cannot be acquired in time, or whose write
    /// fails, is dropped for this call with an error log — `save` itself
    /// never fails.
    pub fn save(&self, records: &[HarvestRecord]) -> usize {
        if records.is_empty() {
            return 0;
        }

        let mut groups: HashMap<PathBuf, Vec<&HarvestRecord>> = HashMap::new();
        for record in records {
            groups
                .entry(self.resolve_path(record))
                .or_default()
                .push(record);
        }

        let mut written = 0;
        for (path, group) in groups {
            match self.write_group(&path, &group) {
                Ok(count) => written += count,
                Err(StoreError::LockTimeout(timeout)) => {
                    error!(
                        path = %path.display(),
                        ?timeout,
                        dropped = group.len(),
                        "lock timeout, skipping destination"
                    );
                }
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        dropped = group.len(),
                        "write failed, skipping destination"
                    );
                }
            }
        }
        written
    }

    /// Destination for one record:
    /// `{root}/markets/{sport}/{competition}/{captured_on}/records.json`.
    pub fn resolve_path(&self, record: &HarvestRecord) -> PathBuf {
        let mut path = self.root.join(KIND_DIR);
        for bucket in record.storage_buckets() {
            path.push(bucket);
        }
        path.push(DATA_FILE);
        path
    }

    fn write_group(&self, path: &Path, records: &[&HarvestRecord]) -> Result<usize, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_path = path.with_file_name(LOCK_FILE);
        let lock = acquire_lock(&lock_path, self.lock_timeout)?;
        let result = merge_and_write(path, records);
        let _ = FileExt::unlock(&lock);
        result
    }
}

fn acquire_lock(lock_path: &Path, timeout: Duration) -> Result<File, StoreError> {
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path)?;

    let deadline = Instant::now() + timeout;
    loop {
        match lock.try_lock_exclusive() {
            Ok(()) => return Ok(lock),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(StoreError::LockTimeout(timeout));
                }
                std::thread::sleep(LOCK_RETRY);
            }
            Err(e) => return Err(StoreError::Io(e)),
        }
    }
}

fn merge_and_write(path: &Path, records: &[&HarvestRecord]) -> Result<usize, StoreError> {
    let mut existing = read_existing(path);

    let existing_ids: HashSet<String> = existing
        .iter()
        .filter_map(|value| value.get(IDENTITY_KEY).and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let new_values: Vec<Value> = records
        .iter()
        .filter(|record| !existing_ids.contains(&record.id))
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?;

    if new_values.is_empty() {
        debug!(
            path = %path.display(),
            submitted = records.len(),
            "all records already stored"
        );
        return Ok(0);
    }

    let count = new_values.len();
    existing.extend(new_values);
    write_atomic(path, &existing)?;

    debug!(
        path = %path.display(),
        written = count,
        total = existing.len(),
        "wrote records"
    );
    Ok(count)
}

// A destination that cannot be read or parsed is treated as empty and
// overwritten on the next successful write.
fn read_existing(path: &Path) -> Vec<Value> {
    if !path.exists() {
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not open existing file, overwriting");
            return Vec::new();
        }
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!(path = %path.display(), "existing file is not a JSON array, overwriting");
            Vec::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not parse existing file, overwriting");
            Vec::new()
        }
    }
}

/// Whole-file replacement: write to `.tmp`, sync, then rename over the
/// destination so readers never observe a partial array.
fn write_atomic(path: &Path, values: &[Value]) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("tmp");

    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, values)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
