use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MAPPER_URL: &str = "http://houstonmapper:8099";
pub const DEFAULT_IMPORTER_URL: &str = "http://houston-importer:8090";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

fn require(value: &str, what: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// S3 configuration for the bucket holding input blobs and page images
#[derive(Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>, // For MinIO/S3-compatible services
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl S3Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.bucket_name, "Bucket name")?;
        require(&self.region, "Region")?;
        require(&self.access_key_id, "Access key ID")?;
        require(&self.secret_access_key, "Secret access key")?;
        Ok(())
    }
}

/// Connection parameters for the target Dataverse collection.
///
/// Forwarded verbatim to the importer service on every call.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DataverseInfo {
    /// May be empty; the importer service then uses its own default instance.
    pub base_url: String,
    pub dt_alias: String,
    pub api_token: String,
}

impl fmt::Debug for DataverseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataverseInfo")
            .field("base_url", &self.base_url)
            .field("dt_alias", &self.dt_alias)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl DataverseInfo {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.dt_alias, "Dataverse alias")?;
        require(&self.api_token, "Dataverse API token")?;
        Ok(())
    }
}

/// Base URLs of the mapper and importer services
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEndpoints {
    pub mapper_url: String,
    pub importer_url: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            mapper_url: DEFAULT_MAPPER_URL.to_string(),
            importer_url: DEFAULT_IMPORTER_URL.to_string(),
        }
    }
}

/// Object keys of the JSON inputs stored in the bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BlobKeys {
    pub mapping: String,
    pub template: String,
    pub issues: String,
    pub publications: String,
}

impl BlobKeys {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.mapping, "Mapping JSON key")?;
        require(&self.template, "Template JSON key")?;
        require(&self.issues, "Issue data key")?;
        require(&self.publications, "Newspaper data key")?;
        Ok(())
    }
}

/// Everything one ingestion run needs, assembled once at startup
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub s3: S3Config,
    pub dataverse: DataverseInfo,
    pub endpoints: ServiceEndpoints,
    pub blobs: BlobKeys,
    /// Keep going after a record fails instead of halting the run
    pub continue_on_error: bool,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.s3.validate()?;
        self.dataverse.validate()?;
        self.blobs.validate()?;
        require(&self.endpoints.mapper_url, "Mapper URL")?;
        require(&self.endpoints.importer_url, "Importer URL")?;
        Ok(())
    }
}

/// Load a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!("Config: loaded {}", path.display()),
        Err(_) => debug!("Config: no .env file found, using flags and environment"),
    }
}

/// Command line flags for `houston-ingest`; every flag falls back to an env var
#[derive(Parser, Clone)]
#[command(
    name = "houston-ingest",
    about = "Ingest newspaper issue records and page images into a Dataverse collection"
)]
pub struct IngestArgs {
    /// Dataverse API token
    #[arg(long, env = "HOUSTON_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Dataverse collection alias
    #[arg(long, env = "HOUSTON_DT_ALIAS")]
    pub dt_alias: String,

    /// Dataverse base URL (optional; the importer falls back to its default)
    #[arg(long, env = "HOUSTON_ENDPOINT_URL", default_value = "")]
    pub endpoint_url: String,

    /// S3/MinIO access key
    #[arg(long, env = "HOUSTON_S3_ACCESS_KEY")]
    pub s3_access_key: String,

    /// S3/MinIO secret key
    #[arg(long, env = "HOUSTON_S3_SECRET_KEY", hide_env_values = true)]
    pub s3_secret_key: String,

    /// S3/MinIO endpoint URL
    #[arg(long, env = "HOUSTON_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// S3 region
    #[arg(long, env = "HOUSTON_S3_REGION", default_value = DEFAULT_REGION)]
    pub s3_region: String,

    /// S3 bucket name
    #[arg(long, env = "HOUSTON_S3_BUCKET")]
    pub s3_bucket: String,

    /// S3 key for newspaper-level data JSON
    #[arg(long, env = "HOUSTON_NEWSPAPER_DATA_KEY")]
    pub newspaper_data_key: String,

    /// S3 key for issue data JSON
    #[arg(long, env = "HOUSTON_ISSUE_DATA_KEY")]
    pub issue_data_key: String,

    /// S3 key for mapping JSON
    #[arg(long, env = "HOUSTON_MAPPINGJSON_KEY")]
    pub mappingjson_key: String,

    /// S3 key for template JSON
    #[arg(long, env = "HOUSTON_TEMPLATEJSON_KEY")]
    pub templatejson_key: String,

    /// Mapper service base URL
    #[arg(long, env = "HOUSTON_MAPPER_URL", default_value = DEFAULT_MAPPER_URL)]
    pub mapper_url: String,

    /// Importer service base URL
    #[arg(long, env = "HOUSTON_IMPORTER_URL", default_value = DEFAULT_IMPORTER_URL)]
    pub importer_url: String,

    /// Record failures and move on to the next issue instead of stopping
    #[arg(long, env = "HOUSTON_CONTINUE_ON_ERROR", default_value_t = false)]
    pub continue_on_error: bool,
}

impl IngestArgs {
    pub fn into_config(self) -> IngestConfig {
        IngestConfig {
            s3: S3Config {
                bucket_name: self.s3_bucket,
                region: self.s3_region,
                access_key_id: self.s3_access_key,
                secret_access_key: self.s3_secret_key,
                endpoint_url: self.s3_endpoint.filter(|e| !e.trim().is_empty()),
            },
            dataverse: DataverseInfo {
                base_url: self.endpoint_url,
                dt_alias: self.dt_alias,
                api_token: self.api_key,
            },
            endpoints: ServiceEndpoints {
                mapper_url: self.mapper_url,
                importer_url: self.importer_url,
            },
            blobs: BlobKeys {
                mapping: self.mappingjson_key,
                template: self.templatejson_key,
                issues: self.issue_data_key,
                publications: self.newspaper_data_key,
            },
            continue_on_error: self.continue_on_error,
        }
    }
}
