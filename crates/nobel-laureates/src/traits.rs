//! Collaborator seams: transport, image persistence, and the record sink.

use async_trait::async_trait;
use url::Url;

use crate::types::{HarvestResult, LaureateRecord, StorageRef};

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: Url,
    /// Where the response actually came from after redirects. Relative links
    /// in the body resolve against this.
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    /// A page served directly from `url` with status 200.
    pub fn ok(url: Url, body: impl Into<String>) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            body: body.into(),
        }
    }
}

/// Fetches pages and image bytes.
///
/// Unrelated requests may complete in any order; each call's result belongs
/// to that call alone.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch an HTML document. Non-success statuses are errors.
    async fn fetch(&self, url: &Url) -> HarvestResult<FetchedPage>;
    /// Fetch raw bytes (used for images).
    async fn fetch_bytes(&self, url: &Url) -> HarvestResult<Vec<u8>>;
}

/// Persists fetched image bytes.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, bytes: &[u8], source: &Url) -> HarvestResult<StorageRef>;
}

/// Receives finished records. Called exactly once per completed entity.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn emit(&self, record: LaureateRecord) -> HarvestResult<()>;
}
