//! Portrait resolution: fetch every candidate, keep the first that stored.

use futures::future::join_all;
use tracing::debug;
use url::Url;

use crate::traits::{Fetcher, ImageStore};
use crate::types::{HarvestResult, LaureateRecord, StorageRef};

/// Fetch and store all `candidates` concurrently and return the reference of
/// the first success in list order. Failed candidates are dropped without
/// retry; completion order has no effect on the choice.
pub async fn resolve_image(
    candidates: &[Url],
    fetcher: &dyn Fetcher,
    store: &dyn ImageStore,
) -> Option<StorageRef> {
    let attempts = candidates
        .iter()
        .map(|url| fetch_and_store(url, fetcher, store));

    join_all(attempts)
        .await
        .into_iter()
        .zip(candidates)
        .find_map(|(result, url)| match result {
            Ok(reference) => Some(reference),
            Err(e) => {
                debug!("image candidate {url} dropped: {e}");
                None
            }
        })
}

/// Resolve the record's candidates and attach the winner as `bio_image`.
/// Returns whether an image was attached.
pub async fn attach_image(
    record: &mut LaureateRecord,
    fetcher: &dyn Fetcher,
    store: &dyn ImageStore,
) -> bool {
    if record.image_urls.is_empty() {
        return false;
    }
    record.bio_image = resolve_image(&record.image_urls, fetcher, store).await;
    record.bio_image.is_some()
}

async fn fetch_and_store(
    url: &Url,
    fetcher: &dyn Fetcher,
    store: &dyn ImageStore,
) -> HarvestResult<StorageRef> {
    let bytes = fetcher.fetch_bytes(url).await?;
    store.store(&bytes, url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFetcher, MemoryImageStore};
    use std::time::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_no_candidates_resolves_nothing() {
        let fetcher = MemoryFetcher::new();
        let store = MemoryImageStore::new();
        assert!(resolve_image(&[], &fetcher, &store).await.is_none());
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_second_success() {
        let fetcher = MemoryFetcher::new().with_bytes("https://img.test/b.jpg", b"bbb".to_vec());
        let store = MemoryImageStore::new();
        let candidates = [url("https://img.test/a.jpg"), url("https://img.test/b.jpg")];

        let reference = resolve_image(&candidates, &fetcher, &store).await;
        assert_eq!(
            reference,
            Some(MemoryImageStore::reference_for(&candidates[1]))
        );
        let stored = store.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, candidates[1]);
    }

    #[tokio::test]
    async fn test_list_order_beats_completion_order() {
        let fetcher = MemoryFetcher::new()
            .with_bytes("https://img.test/slow.jpg", b"slow".to_vec())
            .with_delay("https://img.test/slow.jpg", Duration::from_millis(50))
            .with_bytes("https://img.test/fast.jpg", b"fast".to_vec());
        let store = MemoryImageStore::new();
        let candidates = [
            url("https://img.test/slow.jpg"),
            url("https://img.test/fast.jpg"),
        ];

        let reference = resolve_image(&candidates, &fetcher, &store).await;
        assert_eq!(
            reference,
            Some(MemoryImageStore::reference_for(&candidates[0]))
        );
        // every candidate is attempted
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_drops_candidate() {
        let fetcher = MemoryFetcher::new()
            .with_bytes("https://img.test/a.jpg", Vec::new())
            .with_bytes("https://img.test/b.jpg", b"ok".to_vec());
        let store = MemoryImageStore::new();
        let candidates = [url("https://img.test/a.jpg"), url("https://img.test/b.jpg")];

        let reference = resolve_image(&candidates, &fetcher, &store).await;
        assert_eq!(
            reference,
            Some(MemoryImageStore::reference_for(&candidates[1]))
        );
    }

    #[tokio::test]
    async fn test_attach_image_all_fail_leaves_absent() {
        let fetcher = MemoryFetcher::new();
        let store = MemoryImageStore::new();
        let mut record = LaureateRecord::seed(url("https://en.wikipedia.org/wiki/A"), Default::default());
        record.image_urls = vec![url("https://img.test/missing.jpg")];

        assert!(!attach_image(&mut record, &fetcher, &store).await);
        assert!(record.bio_image.is_none());
    }
}
