//! Read-through cache of parsed uploads, keyed by content digest.
//!
//! At most [`DEFAULT_CAPACITY`] datasets stay in memory; the oldest insert is
//! evicted first. When a directory is configured, each parsed dataset is also
//! written there as `<digest>.json` so a restart (or an evicted re-upload)
//! can skip re-parsing large uploads.

use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::loader::{digest, load_dataset};
use crate::model::Dataset;

pub const DEFAULT_CAPACITY: usize = 8;

#[derive(Debug)]
pub struct DatasetCache {
    dir: Option<PathBuf>,
    capacity: usize,
    entries: HashMap<String, Arc<Dataset>>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self {
            dir: None,
            capacity: DEFAULT_CAPACITY,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

impl DatasetCache {
    /// A cache that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A cache that also persists entries under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Keeps at most `capacity` datasets in memory (minimum 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the dataset for `bytes`, parsing only on a miss.
    ///
    /// # Errors
    ///
    /// Propagates parse errors from [`load_dataset`]. Disk cache failures are
    /// logged and otherwise ignored.
    pub fn get_or_load(&mut self, bytes: &[u8]) -> Result<Arc<Dataset>> {
        let key = digest(bytes);

        if let Some(hit) = self.entries.get(&key) {
            debug!(digest = %key, "Dataset cache hit (memory)");
            return Ok(Arc::clone(hit));
        }

        if let Some(dataset) = self.read_disk(&key) {
            debug!(digest = %key, "Dataset cache hit (disk)");
            let dataset = Arc::new(dataset);
            self.insert(key, Arc::clone(&dataset));
            return Ok(dataset);
        }

        let dataset = Arc::new(load_dataset(bytes)?);
        self.write_disk(&key, &dataset);
        self.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    fn insert(&mut self, key: String, dataset: Arc<Dataset>) {
        while self.order.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!(digest = %oldest, "Evicted dataset from memory");
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, dataset);
    }

    fn entry_path(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{key}.json"))
    }

    fn read_disk(&self, key: &str) -> Option<Dataset> {
        let path = Self::entry_path(self.dir.as_deref()?, key);
        if !path.exists() {
            return None;
        }
        let parsed = File::open(&path)
            .map_err(anyhow::Error::from)
            .and_then(|f| Ok(serde_json::from_reader(BufReader::new(f))?));
        match parsed {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    fn write_disk(&self, key: &str, dataset: &Dataset) {
        let Some(dir) = self.dir.as_deref() else {
            return;
        };
        let path = Self::entry_path(dir, key);
        let written = fs::create_dir_all(dir)
            .and_then(|()| File::create(&path))
            .map_err(anyhow::Error::from)
            .and_then(|f| Ok(serde_json::to_writer(BufWriter::new(f), dataset)?));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "Failed to persist dataset cache entry");
        }
    }
}
