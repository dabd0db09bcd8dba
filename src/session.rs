//! Per-user analysis context.
//!
//! Holds the current upload and anything derived from it. Components receive
//! what they need from here explicitly; nothing is global.

use std::sync::Arc;

use tracing::info;

use crate::aggregate::OutlierBound;
use crate::cache::DatasetCache;
use crate::derive::{DerivedDataset, derive};
use crate::error::{Error, Result};
use crate::model::{Dataset, TripRecord};

#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<Arc<Dataset>>,
    derived: Option<Arc<DerivedDataset>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current dataset, dropping everything derived from the old one.
    pub fn load(&mut self, dataset: Arc<Dataset>) {
        info!(
            rows = dataset.len(),
            digest = %dataset.source_digest,
            "Session dataset replaced"
        );
        self.dataset = Some(dataset);
        self.derived = None;
    }

    /// Parses `bytes` through `cache` and makes the result current.
    ///
    /// On failure the previous dataset stays loaded.
    pub fn upload(&mut self, cache: &mut DatasetCache, bytes: &[u8]) -> Result<&Dataset> {
        let dataset = cache.get_or_load(bytes)?;
        let unchanged = self
            .dataset
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &dataset));
        if !unchanged {
            self.load(dataset);
        }
        self.dataset()
    }

    pub fn clear(&mut self) {
        self.dataset = None;
        self.derived = None;
    }

    /// # Errors
    ///
    /// Returns [`Error::Input`] when nothing has been uploaded yet.
    pub fn dataset(&self) -> Result<&Dataset> {
        self.dataset
            .as_deref()
            .ok_or_else(|| Error::input("no data to be analyzed, upload a file first"))
    }

    /// The derived columns for the current dataset, computed on first use.
    pub fn derived(&mut self) -> Result<Arc<DerivedDataset>> {
        if let Some(derived) = &self.derived {
            return Ok(Arc::clone(derived));
        }
        let derived = Arc::new(derive(self.dataset()?)?);
        self.derived = Some(Arc::clone(&derived));
        Ok(derived)
    }

    pub fn taxi_ids(&self) -> Result<Vec<i64>> {
        Ok(self.dataset()?.taxi_ids())
    }

    /// Observed whole-minute duration range, the default duration filter.
    pub fn duration_bounds(&self) -> Result<OutlierBound> {
        let dataset = self.dataset()?;
        OutlierBound::observed(dataset.records.iter().map(TripRecord::duration_minutes))
            .ok_or_else(|| Error::input("the uploaded file is empty"))
    }
}
