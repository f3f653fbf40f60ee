use crate::models::{NormalizedAsset, RepositoryMetadata};
use reqwest::{Client, Error as ReqwestError};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound for one mapper call
pub const MAPPER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
    #[error("Mapper returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Mapping and template documents, loaded once per run
#[derive(Debug, Clone, PartialEq)]
pub struct MappingSpec {
    pub mapping: Value,
    pub template: Value,
}

#[derive(Debug, Serialize)]
struct MapperRequest<'a> {
    metadata: &'a NormalizedAsset,
    template: &'a Value,
    mapping: &'a Value,
}

/// Turns normalized metadata into repository-ready metadata
#[async_trait::async_trait]
pub trait MetadataMapper: Send + Sync {
    async fn map(
        &self,
        asset: &NormalizedAsset,
        spec: &MappingSpec,
    ) -> Result<RepositoryMetadata, MapperError>;
}

/// Client for the mapper service (`POST /mapper/`)
#[derive(Clone)]
pub struct HttpMapperClient {
    client: Client,
    base_url: String,
}

impl HttpMapperClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn mapper_url(&self) -> String {
        format!("{}/mapper/", self.base_url)
    }
}

#[async_trait::async_trait]
impl MetadataMapper for HttpMapperClient {
    async fn map(
        &self,
        asset: &NormalizedAsset,
        spec: &MappingSpec,
    ) -> Result<RepositoryMetadata, MapperError> {
        let url = self.mapper_url();
        let body = MapperRequest {
            metadata: asset,
            template: &spec.template,
            mapping: &spec.mapping,
        };

        info!("📡 Mapper: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(MAPPER_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            let mapped: Value = response.json().await?;
            debug!("Mapper response: {}", mapped);
            Ok(RepositoryMetadata(mapped))
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!("✗ Mapper error: {}", status);
            Err(MapperError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
