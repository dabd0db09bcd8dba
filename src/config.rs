//! Runtime settings read from the environment (and `.env`, loaded by the binary).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::geocode::retry::DEFAULT_ATTEMPTS;

pub const DEFAULT_GEOCODER_URL: &str = "http://api.map.baidu.com/reverse_geocoding/v3/";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `GEOCODER_BASE_URL`
    pub geocoder_base_url: String,
    /// `GEOCODER_AK`, the service access key.
    pub geocoder_ak: String,
    /// `GEOCODER_TIMEOUT_SECS`
    pub geocoder_timeout: Duration,
    /// `GEOCODER_ATTEMPTS`
    pub geocoder_attempts: u32,
    /// `CACHE_DIR`; unset keeps parsed uploads in memory only.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder_base_url: DEFAULT_GEOCODER_URL.to_string(),
            geocoder_ak: String::new(),
            geocoder_timeout: Duration::from_secs(10),
            geocoder_attempts: DEFAULT_ATTEMPTS,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let geocoder_timeout = match get("GEOCODER_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("GEOCODER_TIMEOUT_SECS is not a number: {v:?}"))?,
            ),
            None => defaults.geocoder_timeout,
        };

        let geocoder_attempts = match get("GEOCODER_ATTEMPTS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("GEOCODER_ATTEMPTS is not a number: {v:?}"))?,
            None => defaults.geocoder_attempts,
        };

        Ok(Self {
            geocoder_base_url: get("GEOCODER_BASE_URL").unwrap_or(defaults.geocoder_base_url),
            geocoder_ak: get("GEOCODER_AK").unwrap_or_default(),
            geocoder_timeout,
            geocoder_attempts,
            cache_dir: get("CACHE_DIR").filter(|d| !d.is_empty()).map(PathBuf::from),
        })
    }
}
