use crate::cloud_storage::{ObjectStorage, StorageError};
use crate::ingest::normalizer::separate_list;
use crate::models::ResolvedFile;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Finds and downloads the page images belonging to one issue.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    storage: ObjectStorage,
}

/// Display filename for a storage key: its last path segment
pub fn filename_for_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

impl AssetResolver {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// Every key under the `identifier` prefix, sorted and deduplicated.
    ///
    /// `pages` only gates the lookup: if it lists no pages, or the identifier
    /// is empty, storage is not queried at all.
    pub async fn resolve_keys(
        &self,
        identifier: &str,
        pages: Option<&str>,
    ) -> Result<BTreeSet<String>, StorageError> {
        let mut keys = BTreeSet::new();

        let pages = separate_list(pages).unwrap_or_default();
        debug!("AssetResolver: {} pages listed for {}", pages.len(), identifier);

        if pages.is_empty() || identifier.is_empty() {
            return Ok(keys);
        }

        let mut token: Option<String> = None;
        loop {
            let page = self.storage.list_page(identifier, token.as_deref()).await?;
            keys.extend(page.keys);
            match page.next_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(StorageError::Sdk(format!(
                        "Listing {} returned continuation token {} twice",
                        identifier, next
                    )));
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        if keys.is_empty() {
            info!("AssetResolver: no files found under prefix {}", identifier);
        }
        Ok(keys)
    }

    /// Download each key; any failure aborts the whole batch.
    pub async fn fetch(&self, keys: &BTreeSet<String>) -> Result<Vec<ResolvedFile>, StorageError> {
        let mut files = Vec::with_capacity(keys.len());
        for key in keys {
            let content = self.storage.get_object(key).await?;
            debug!("AssetResolver: fetched {} ({} bytes)", key, content.len());
            files.push(ResolvedFile {
                key: key.clone(),
                filename: filename_for_key(key).to_string(),
                content,
            });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud_storage::{ListPage, ObjectStore};
    use crate::test_support::MockObjectStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn resolver_with(store: Arc<MockObjectStore>) -> AssetResolver {
        AssetResolver::new(ObjectStorage::from_store(store))
    }

    #[test]
    fn test_filename_for_key() {
        assert_eq!(filename_for_key("HN-1921/scans/p1.jpg"), "p1.jpg");
        assert_eq!(filename_for_key("p1.jpg"), "p1.jpg");
        assert_eq!(filename_for_key("HN-1921/"), "");
    }

    #[tokio::test]
    async fn test_empty_pages_skip_listing() {
        let store = Arc::new(MockObjectStore::new());
        store.insert("HN-1921/p1.jpg", vec![1]);
        let resolver = resolver_with(store.clone());

        for pages in [None, Some(""), Some(" ; ")] {
            let keys = resolver.resolve_keys("HN-1921", pages).await.unwrap();
            assert!(keys.is_empty());
        }
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_identifier_skips_listing() {
        let store = Arc::new(MockObjectStore::new());
        store.insert("p1.jpg", vec![1]);
        let resolver = resolver_with(store.clone());

        let keys = resolver.resolve_keys("", Some("p1.jpg")).await.unwrap();
        assert!(keys.is_empty());
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolves_across_pages() {
        let store = Arc::new(MockObjectStore::with_page_size(1));
        store.insert("HN-1921/p1.jpg", vec![1]);
        store.insert("HN-1921/p2.jpg", vec![2]);
        store.insert("HN-1922/p1.jpg", vec![3]);
        let resolver = resolver_with(store.clone());

        let keys = resolver
            .resolve_keys("HN-1921", Some("p1.jpg; p2.jpg"))
            .await
            .unwrap();

        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["HN-1921/p1.jpg".to_string(), "HN-1921/p2.jpg".to_string()]
        );
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_key_repeated_across_pages_resolved_once() {
        let store = Arc::new(MockObjectStore::with_page_size(1));
        store.insert("HN-1921/p1.jpg", vec![1]);
        store.insert("HN-1921/p2.jpg", vec![2]);
        store.relist("HN-1921/p1.jpg");
        let resolver = resolver_with(store.clone());

        let first = store.list_page("HN-1921", None).await.unwrap();
        let second = store.list_page("HN-1921", first.next_token.as_deref()).await.unwrap();
        assert_eq!(second.keys, vec!["HN-1921/p2.jpg", "HN-1921/p1.jpg"]);

        let keys = resolver
            .resolve_keys("HN-1921", Some("p1.jpg; p2.jpg"))
            .await
            .unwrap();
        assert_eq!(
            keys.iter().cloned().collect::<Vec<_>>(),
            vec!["HN-1921/p1.jpg".to_string(), "HN-1921/p2.jpg".to_string()]
        );

        let files = resolver.fetch(&keys).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(store.get_calls(), 2);
    }

    /// Store whose listing never advances past its first token
    #[derive(Default)]
    struct StuckStore {
        list_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ObjectStore for StuckStore {
        async fn list_page(
            &self,
            prefix: &str,
            _continuation_token: Option<&str>,
        ) -> Result<ListPage, StorageError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ListPage {
                keys: vec![format!("{}/p1.jpg", prefix)],
                next_token: Some("stuck".to_string()),
            })
        }

        async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    #[tokio::test]
    async fn test_repeated_continuation_token_stops_listing() {
        let store = Arc::new(StuckStore::default());
        let resolver = AssetResolver::new(ObjectStorage::from_store(store.clone()));

        let result = resolver.resolve_keys("HN-1921", Some("p1.jpg")).await;

        assert!(matches!(result, Err(StorageError::Sdk(_))));
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pages_do_not_filter_keys() {
        let store = Arc::new(MockObjectStore::new());
        store.insert("HN-1921/p1.jpg", vec![1]);
        store.insert("HN-1921/cover.tif", vec![2]);
        let resolver = resolver_with(store);

        let keys = resolver.resolve_keys("HN-1921", Some("p1.jpg")).await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_returns_filename_and_content() {
        let store = Arc::new(MockObjectStore::new());
        store.insert("HN-1921/p1.jpg", b"jpeg-1".to_vec());
        store.insert("HN-1921/p2.jpg", b"jpeg-2".to_vec());
        let resolver = resolver_with(store);

        let keys = resolver
            .resolve_keys("HN-1921", Some("p1.jpg; p2.jpg"))
            .await
            .unwrap();
        let files = resolver.fetch(&keys).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "p1.jpg");
        assert_eq!(files[0].content, b"jpeg-1");
        assert_eq!(files[1].key, "HN-1921/p2.jpg");
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_batch() {
        let store = Arc::new(MockObjectStore::new());
        store.insert("HN-1921/p1.jpg", vec![1]);
        store.insert("HN-1921/p2.jpg", vec![2]);
        store.insert("HN-1921/p3.jpg", vec![3]);
        store.fail_get("HN-1921/p2.jpg");
        let resolver = resolver_with(store.clone());

        let keys = resolver.resolve_keys("HN-1921", Some("p1.jpg")).await.unwrap();
        assert!(resolver.fetch(&keys).await.is_err());
        // p3 is never requested once p2 fails
        assert_eq!(store.get_calls(), 2);
    }
}
