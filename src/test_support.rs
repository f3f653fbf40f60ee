// Test support utilities for both unit and integration tests

use crate::cloud_storage::{ListPage, ObjectStore, StorageError};
use crate::config::DataverseInfo;
use crate::dataverse::{
    ImporterError, MapperError, MappingSpec, MetadataMapper, RepositoryImporter, UploadAck,
};
use crate::models::{NormalizedAsset, PersistentId, RepositoryMetadata, ResolvedFile};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock object store for testing
///
/// Keeps objects in memory and pages listings `page_size` keys at a time.
pub struct MockObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_gets: Mutex<HashSet<String>>,
    relisted: Mutex<HashSet<String>>,
    page_size: usize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::with_page_size(1000)
    }
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        MockObjectStore {
            objects: Mutex::new(BTreeMap::new()),
            failing_gets: Mutex::new(HashSet::new()),
            relisted: Mutex::new(HashSet::new()),
            page_size: page_size.max(1),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    /// Make `get_object` fail for `key` even though it is listed
    pub fn fail_get(&self, key: &str) {
        self.failing_gets.lock().unwrap().insert(key.to_string());
    }

    /// List `key` again on every page after the one it first appears on,
    /// the way an eventually consistent listing can
    pub fn relist(&self, key: &str) {
        self.relisted.lock().unwrap().insert(key.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let start = match continuation_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StorageError::Sdk(format!("Bad continuation token: {}", token)))?,
            None => 0,
        };

        let matching: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        let end = (start + self.page_size).min(matching.len());
        let mut keys = matching.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
        let relisted = self.relisted.lock().unwrap();
        keys.extend(
            matching
                .iter()
                .take(start.min(matching.len()))
                .filter(|key| relisted.contains(*key))
                .cloned(),
        );
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(ListPage { keys, next_token })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_gets.lock().unwrap().contains(key) {
            return Err(StorageError::Sdk(format!("Get object {} failed", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

/// Mock mapper that echoes the asset back inside a dataset envelope
#[derive(Default)]
pub struct MockMapper {
    seen: Mutex<Vec<NormalizedAsset>>,
    fail_titles: Mutex<HashSet<String>>,
    fail_all: Mutex<bool>,
}

impl MockMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a 500
    pub fn fail_all(&self) {
        *self.fail_all.lock().unwrap() = true;
    }

    /// Calls for assets with this title fail with a 500
    pub fn fail_title(&self, title: &str) {
        self.fail_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<NormalizedAsset> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MetadataMapper for MockMapper {
    async fn map(
        &self,
        asset: &NormalizedAsset,
        _spec: &MappingSpec,
    ) -> Result<RepositoryMetadata, MapperError> {
        self.seen.lock().unwrap().push(asset.clone());

        let title_fails = asset
            .title
            .as_ref()
            .is_some_and(|t| self.fail_titles.lock().unwrap().contains(t));
        if *self.fail_all.lock().unwrap() || title_fails {
            return Err(MapperError::Status {
                status: 500,
                body: "mapper exploded".to_string(),
            });
        }

        Ok(RepositoryMetadata(json!({
            "datasetVersion": { "metadata": asset }
        })))
    }
}

/// One recorded `attach_file` call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAttachment {
    pub filename: String,
    pub persistent_id: PersistentId,
    pub size: usize,
}

/// Mock importer that hands out a fixed DOI (or numbered DOIs) and records uploads
pub struct MockImporter {
    doi: String,
    numbered: bool,
    create_calls: AtomicUsize,
    created: Mutex<Vec<RepositoryMetadata>>,
    attachments: Mutex<Vec<RecordedAttachment>>,
    fail_create: Mutex<bool>,
    failing_files: Mutex<HashSet<String>>,
}

impl MockImporter {
    /// Every created record gets `doi`
    pub fn new(doi: &str) -> Self {
        MockImporter {
            doi: doi.to_string(),
            numbered: false,
            create_calls: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            attachments: Mutex::new(Vec::new()),
            fail_create: Mutex::new(false),
            failing_files: Mutex::new(HashSet::new()),
        }
    }

    /// Created records get `{prefix}{n}`, counting from 1
    pub fn numbered(prefix: &str) -> Self {
        MockImporter {
            numbered: true,
            ..Self::new(prefix)
        }
    }

    pub fn fail_create(&self) {
        *self.fail_create.lock().unwrap() = true;
    }

    /// Uploads of `filename` fail with a 500
    pub fn fail_file(&self, filename: &str) {
        self.failing_files
            .lock()
            .unwrap()
            .insert(filename.to_string());
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<RepositoryMetadata> {
        self.created.lock().unwrap().clone()
    }

    pub fn attachments(&self) -> Vec<RecordedAttachment> {
        self.attachments.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RepositoryImporter for MockImporter {
    async fn create_record(
        &self,
        metadata: &RepositoryMetadata,
        _target: &DataverseInfo,
    ) -> Result<PersistentId, ImporterError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if *self.fail_create.lock().unwrap() {
            return Err(ImporterError::Status {
                status: 500,
                body: "importer exploded".to_string(),
            });
        }

        self.created.lock().unwrap().push(metadata.clone());
        if self.numbered {
            Ok(PersistentId(format!("{}{}", self.doi, n)))
        } else {
            Ok(PersistentId(self.doi.clone()))
        }
    }

    async fn attach_file(
        &self,
        file: &ResolvedFile,
        persistent_id: &PersistentId,
        _target: &DataverseInfo,
    ) -> Result<UploadAck, ImporterError> {
        if self.failing_files.lock().unwrap().contains(&file.filename) {
            return Err(ImporterError::Status {
                status: 500,
                body: format!("upload of {} failed", file.filename),
            });
        }

        self.attachments.lock().unwrap().push(RecordedAttachment {
            filename: file.filename.clone(),
            persistent_id: persistent_id.clone(),
            size: file.content.len(),
        });
        Ok(UploadAck { status: 200 })
    }
}
