pub mod aggregate;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod derive;
pub mod error;
pub mod geocode;
pub mod hotspot;
pub mod loader;
pub mod model;
pub mod output;
pub mod route;
pub mod session;
pub mod stats;
pub mod views;

pub use error::{Error, LookupError, Result};
