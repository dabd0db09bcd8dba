//! Error taxonomy shared by every pipeline stage.

use serde::{Serialize, Serializer};

pub type Result<T> = std::result::Result<T, Error>;

/// A failed operation. None of these are fatal to a [`crate::session::Session`];
/// the caller reports the message and the user can retry.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing or malformed upload, or an out-of-range user parameter.
    #[error("input error: {0}")]
    Input(String),

    /// A field could not be interpreted (e.g. a truncated timestamp).
    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("clustering failed: {0}")]
    Cluster(#[from] linfa_clustering::KMeansError),
}

impl Error {
    pub fn input(message: impl Into<String>) -> Self {
        Error::Input(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }
}

/// Reverse-geocoding failure.
#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoding service returned HTTP {0}")]
    Status(u16),

    /// The body arrived but did not contain a usable address.
    #[error("unusable geocoding response: {0}")]
    Response(String),

    #[error("lookup for hot spot {index} at ({lat:.5}, {lon:.5}) failed: {source}")]
    Centroid {
        index: usize,
        lat: f64,
        lon: f64,
        #[source]
        source: Box<LookupError>,
    },
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_error_names_the_hot_spot() {
        let err = Error::from(LookupError::Centroid {
            index: 2,
            lat: 30.5,
            lon: 114.25,
            source: Box::new(LookupError::Status(503)),
        });
        let message = err.to_string();
        assert!(message.contains("hot spot 2"));
        assert!(message.contains("503"));
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = Error::input("no data to be analyzed");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"input error: no data to be analyzed\"");
    }
}
