//! In-memory collaborators for exercising the pipeline without a network.
//!
//! Useful for testing code built on this crate as well as the crate itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::traits::{FetchedPage, Fetcher, ImageStore, RecordSink};
use crate::types::{HarvestError, HarvestResult, LaureateRecord, StorageRef};

/// A fetcher serving canned pages and bytes keyed by URL. Unknown URLs fail
/// with a 404 status error.
#[derive(Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, FetchedPage>,
    bytes: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
    requested: Mutex<Vec<Url>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        let parsed = parse(url);
        self.with_fetched(FetchedPage::ok(parsed, body))
    }

    /// Serve `body` for `url` as though it had been redirected to `final_url`.
    pub fn with_redirect(self, url: &str, final_url: &str, body: impl Into<String>) -> Self {
        let mut page = FetchedPage::ok(parse(url), body);
        page.final_url = parse(final_url);
        self.with_fetched(page)
    }

    pub fn with_fetched(mut self, page: FetchedPage) -> Self {
        self.pages.insert(page.url.to_string(), page);
        self
    }

    /// Serve raw `bytes` for `url`.
    pub fn with_bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.bytes.insert(parse(url).to_string(), bytes);
        self
    }

    /// Delay every response for `url`.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(parse(url).to_string(), delay);
        self
    }

    /// Every URL requested so far, in call order.
    pub fn requested(&self) -> Vec<Url> {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn begin(&self, url: &Url) {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.clone());
        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> HarvestResult<FetchedPage> {
        self.begin(url).await;
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| not_found(url))
    }

    async fn fetch_bytes(&self, url: &Url) -> HarvestResult<Vec<u8>> {
        self.begin(url).await;
        self.bytes
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| not_found(url))
    }
}

/// An image store that keeps bytes in memory. Empty payloads are rejected,
/// standing in for undecodable images.
#[derive(Default)]
pub struct MemoryImageStore {
    stored: Mutex<Vec<(Url, Vec<u8>)>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference this store hands out for `source`.
    pub fn reference_for(source: &Url) -> StorageRef {
        StorageRef(format!("memory/{}", source.path().trim_start_matches('/')))
    }

    pub fn stored(&self) -> Vec<(Url, Vec<u8>)> {
        self.stored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, bytes: &[u8], source: &Url) -> HarvestResult<StorageRef> {
        if bytes.is_empty() {
            return Err(HarvestError::Image(format!("empty image from {source}")));
        }
        self.stored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((source.clone(), bytes.to_vec()));
        Ok(Self::reference_for(source))
    }
}

/// A sink collecting emitted records. Records whose name is in the reject
/// list fail to emit.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LaureateRecord>>,
    reject: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.reject.push(name.to_string());
        self
    }

    pub fn records(&self) -> Vec<LaureateRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&self, record: LaureateRecord) -> HarvestResult<()> {
        if self.reject.contains(&record.name) {
            return Err(HarvestError::Sink(format!("rejected {}", record.name)));
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}

fn parse(url: &str) -> Url {
    Url::parse(url).unwrap_or_else(|e| panic!("test URL {url} is invalid: {e}"))
}

fn not_found(url: &Url) -> HarvestError {
    HarvestError::Status {
        url: url.to_string(),
        status: 404,
    }
}
