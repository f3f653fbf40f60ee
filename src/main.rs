use clap::Parser;
use houston::cloud_storage::ObjectStorage;
use houston::config::{load_dotenv, IngestArgs, IngestConfig};
use houston::dataverse::{HttpImporterClient, HttpMapperClient};
use houston::ingest::{load_run_inputs, IngestPipeline, RunReport};
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};

async fn run(config: IngestConfig) -> Result<RunReport, Box<dyn Error>> {
    config.validate()?;

    info!(
        "s3 endpoint: {}, bucket: {}",
        config.s3.endpoint_url.as_deref().unwrap_or("aws default"),
        config.s3.bucket_name
    );

    let storage = ObjectStorage::new(config.s3.clone()).await?;
    let inputs = load_run_inputs(&storage, &config.blobs).await?;

    let pipeline = IngestPipeline::new(
        storage,
        Arc::new(HttpMapperClient::new(&config.endpoints.mapper_url)),
        Arc::new(HttpImporterClient::new(&config.endpoints.importer_url)),
        inputs.publications,
        inputs.spec,
        config.dataverse.clone(),
    )
    .continue_on_error(config.continue_on_error);

    Ok(pipeline.run(&inputs.issues).await?)
}

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    load_dotenv();
    let config = IngestArgs::parse().into_config();

    match run(config).await {
        Ok(report) => {
            info!(
                "Ingested {}/{} issues",
                report.succeeded.len(),
                report.total()
            );
            for failed in &report.failed {
                warn!("  ✗ {}: {}", failed.identifier, failed.error);
            }
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Ingest run aborted: {}", e);
            std::process::exit(1);
        }
    }
}
