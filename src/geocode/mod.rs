//! Reverse geocoding: coordinates to a human-readable address.
//!
//! Pipeline code depends only on [`ReverseGeocoder`]. [`HttpGeocoder`] is
//! the production implementation, layered over an [`HttpClient`] so the
//! credential ([`auth::UrlParam`]) and timeout ([`BasicClient`]) stay
//! separate concerns.

pub mod auth;
mod basic;
mod client;
mod memo;
pub mod retry;
mod service;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use memo::MemoGeocoder;
pub use service::{HttpGeocoder, parse_response};

use async_trait::async_trait;

use crate::error::LookupError;

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<String, LookupError>;
}
