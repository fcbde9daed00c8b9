//! HTTP access to the publishing site
//!
//! Everything that talks to the network goes through [`Transport`], so the
//! sync loop can be driven by in-memory fakes in tests.

pub mod client;
pub mod fetch;

pub use client::HttpClient;
pub use fetch::{fingerprint, write_file};

use async_trait::async_trait;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn status(url: &Url, status: u16) -> Self {
        FetchError::Status {
            url: url.to_string(),
            status,
        }
    }
}

/// Freshness marker taken from response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    LastModified(String),
    ETag(String),
}

impl Freshness {
    /// `Last-Modified` wins over `ETag`; blank headers count as absent
    pub fn from_headers(last_modified: Option<&str>, etag: Option<&str>) -> Option<Self> {
        let present = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        present(last_modified)
            .map(Freshness::LastModified)
            .or_else(|| present(etag).map(Freshness::ETag))
    }

    /// Opaque marker stored in the state file
    pub fn marker(&self) -> &str {
        match self {
            Freshness::LastModified(v) | Freshness::ETag(v) => v,
        }
    }
}

/// Network operations the sync loop needs
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a page as text; non-success statuses are errors
    async fn get_text(&self, url: &Url) -> Result<String, FetchError>;

    /// HEAD a file and read its freshness marker
    async fn head(&self, url: &Url) -> Result<Option<Freshness>, FetchError>;

    /// GET a file body
    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_modified_preferred() {
        let f = Freshness::from_headers(Some("Tue, 02 Jan 2024 10:00:00 GMT"), Some("\"e1\""));
        assert_eq!(
            f,
            Some(Freshness::LastModified("Tue, 02 Jan 2024 10:00:00 GMT".to_string()))
        );
    }

    #[test]
    fn test_etag_fallback() {
        let f = Freshness::from_headers(None, Some("W/\"e1\"")).unwrap();
        assert_eq!(f, Freshness::ETag("W/\"e1\"".to_string()));
        assert_eq!(f.marker(), "W/\"e1\"");
    }

    #[test]
    fn test_blank_headers_are_absent() {
        assert_eq!(Freshness::from_headers(Some("  "), Some("")), None);
        assert_eq!(Freshness::from_headers(None, None), None);
    }

    #[test]
    fn test_status_error_message() {
        let url = Url::parse("https://example.test/annexes/IV").unwrap();
        let err = FetchError::status(&url, 404);
        assert_eq!(err.to_string(), "https://example.test/annexes/IV returned HTTP 404");
    }
}
