//! Transport abstraction used by the scrape queues

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("domain not allowed: {host}")]
    DomainNotAllowed { host: String },
    #[error("request timed out: {url}")]
    Timeout { url: String },
    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    Status { status: u16, url: String },
}

/// Issues one GET request and returns the response body.
///
/// Implementations never retry; a failed request is reported once and
/// abandoned by the caller.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
