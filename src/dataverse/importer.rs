use crate::config::DataverseInfo;
use crate::models::{PersistentId, RepositoryMetadata, ResolvedFile};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Error as ReqwestError};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound for record creation and for each file upload
pub const IMPORTER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
    #[error("Importer returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Importer response has no data.persistentId: {0}")]
    MissingPersistentId(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ImportRequest<'a> {
    metadata: &'a RepositoryMetadata,
    dataverse_information: &'a DataverseInfo,
}

/// Sent as the `json_data` form field alongside each file
#[derive(Debug, Serialize)]
struct FileUploadPayload<'a> {
    doi: &'a str,
    dataverse_information: &'a DataverseInfo,
}

/// Acknowledgement of one file upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAck {
    pub status: u16,
}

/// Pull `data.persistentId` out of an importer response body
pub fn extract_persistent_id(body: &Value) -> Result<PersistentId, ImporterError> {
    body.pointer("/data/persistentId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(|id| PersistentId(id.to_string()))
        .ok_or_else(|| ImporterError::MissingPersistentId(body.to_string()))
}

fn file_upload_json(doi: &PersistentId, target: &DataverseInfo) -> Result<String, ImporterError> {
    Ok(serde_json::to_string(&FileUploadPayload {
        doi: doi.as_str(),
        dataverse_information: target,
    })?)
}

/// Creates dataset records and attaches files to them
#[async_trait::async_trait]
pub trait RepositoryImporter: Send + Sync {
    async fn create_record(
        &self,
        metadata: &RepositoryMetadata,
        target: &DataverseInfo,
    ) -> Result<PersistentId, ImporterError>;

    async fn attach_file(
        &self,
        file: &ResolvedFile,
        persistent_id: &PersistentId,
        target: &DataverseInfo,
    ) -> Result<UploadAck, ImporterError>;
}

/// Client for the importer service (`POST /importer/`, `POST /file-upload/`)
#[derive(Clone)]
pub struct HttpImporterClient {
    client: Client,
    base_url: String,
}

impl HttpImporterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn importer_url(&self) -> String {
        format!("{}/importer/", self.base_url)
    }

    fn file_upload_url(&self) -> String {
        format!("{}/file-upload/", self.base_url)
    }
}

async fn status_error(response: reqwest::Response) -> ImporterError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ImporterError::Status { status, body }
}

#[async_trait::async_trait]
impl RepositoryImporter for HttpImporterClient {
    async fn create_record(
        &self,
        metadata: &RepositoryMetadata,
        target: &DataverseInfo,
    ) -> Result<PersistentId, ImporterError> {
        let url = self.importer_url();
        info!("📡 Importer: POST {} (collection {})", url, target.dt_alias);

        let response = self
            .client
            .post(&url)
            .json(&ImportRequest {
                metadata,
                dataverse_information: target,
            })
            .timeout(IMPORTER_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            warn!("✗ Importer error: {}", status);
            return Err(status_error(response).await);
        }

        let body: Value = response.json().await?;
        let persistent_id = extract_persistent_id(&body)?;
        info!("✓ Importer created {}", persistent_id);
        Ok(persistent_id)
    }

    async fn attach_file(
        &self,
        file: &ResolvedFile,
        persistent_id: &PersistentId,
        target: &DataverseInfo,
    ) -> Result<UploadAck, ImporterError> {
        let url = self.file_upload_url();
        let form = Form::new()
            .part(
                "file",
                Part::bytes(file.content.clone()).file_name(file.filename.clone()),
            )
            .text("json_data", file_upload_json(persistent_id, target)?);

        info!(
            "📡 Importer: POST {} ({}, {} bytes -> {})",
            url,
            file.filename,
            file.content.len(),
            persistent_id
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(IMPORTER_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("✗ File upload error for {}: {}", file.filename, status);
            return Err(status_error(response).await);
        }

        Ok(UploadAck {
            status: status.as_u16(),
        })
    }
}
