use crate::config::S3Config;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStreamError, Client};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("S3 SDK error: {0}")]
    Sdk(String),
    #[error("ByteStream error: {0}")]
    ByteStream(#[from] ByteStreamError),
    #[error("JSON error in {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page, `None` once the listing is exhausted
    pub next_token: Option<String>,
}

/// Trait for object storage operations (allows mocking for tests)
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys starting with `prefix`.
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, StorageError>;

    /// Fetch the full content of one object.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Production S3 (or MinIO) object store bound to one bucket
pub struct S3ObjectStore {
    client: Client,
    bucket_name: String,
}

impl S3ObjectStore {
    /// Create a new S3 client
    pub async fn new(config: S3Config) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None, // session_token
            None, // expiration
            "houston-s3-config",
        );

        let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);

        // MinIO and friends only speak path-style addressing
        let path_style = config.endpoint_url.is_some();
        if let Some(endpoint) = config.endpoint_url {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(path_style)
            .build();

        Ok(S3ObjectStore {
            client: Client::from_conf(s3_config),
            bucket_name: config.bucket_name,
        })
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, StorageError> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket_name)
            .prefix(prefix);
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Sdk(format!("List objects failed: {}", e)))?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        debug!(
            "S3ObjectStore: listed {} keys under s3://{}/{}",
            keys.len(),
            self.bucket_name,
            prefix
        );

        Ok(ListPage { keys, next_token })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(service_error) if service_error.is_no_such_key() => {
                    StorageError::NotFound(key.to_string())
                }
                _ => StorageError::Sdk(format!("Get object {} failed: {}", key, e)),
            })?;

        let data = response.body.collect().await?.into_bytes().to_vec();

        debug!(
            "S3ObjectStore: downloaded {} bytes from s3://{}/{}",
            data.len(),
            self.bucket_name,
            key
        );
        Ok(data)
    }
}

/// Long-lived storage handle shared by every stage of a run
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("store", &"<dyn ObjectStore>")
            .finish()
    }
}

impl ObjectStorage {
    /// Connect to S3 with the given configuration
    pub async fn new(config: S3Config) -> Result<Self, StorageError> {
        info!(
            "ObjectStorage: connecting to bucket {} (endpoint {})",
            config.bucket_name,
            config.endpoint_url.as_deref().unwrap_or("aws default")
        );
        let store = S3ObjectStore::new(config).await?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Wrap an existing store (e.g. an in-memory fake)
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        ObjectStorage { store }
    }

    pub async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, StorageError> {
        self.store.list_page(prefix, continuation_token).await
    }

    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.store.get_object(key).await
    }

    /// Fetch an object and decode it as JSON
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
        let bytes = self.store.get_object(key).await?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })
    }
}
