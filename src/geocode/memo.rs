use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::ReverseGeocoder;
use crate::error::LookupError;

/// Remembers successful lookups so repeated coordinates (e.g. a taxi's
/// recurring stand) hit the service once. Failures are not remembered.
///
/// The memo grows with the number of distinct coordinates looked up and is
/// never pruned; build one per session or report run and drop it with it.
pub struct MemoGeocoder<G> {
    inner: G,
    hits: Mutex<HashMap<(u64, u64), String>>,
}

impl<G> MemoGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.hits.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<G: ReverseGeocoder> ReverseGeocoder for MemoGeocoder<G> {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<String, LookupError> {
        let key = (lat.to_bits(), lon.to_bits());
        if let Some(hit) = self.hits.lock().ok().and_then(|h| h.get(&key).cloned()) {
            debug!(lat, lon, "Geocode memo hit");
            return Ok(hit);
        }

        let address = self.inner.lookup(lat, lon).await?;
        if let Ok(mut hits) = self.hits.lock() {
            hits.insert(key, address.clone());
        }
        Ok(address)
    }
}
