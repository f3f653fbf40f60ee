// # Ingest Pipeline - Orchestrator
//
// Per issue, strictly in order:
// 1. Normalize the record (never fails)
// 2. Resolve and download its page images
// 3. Map the normalized metadata
// 4. Create the dataset record, yielding its DOI
// 5. Attach every downloaded file to that DOI
//
// Issues are processed one after another. A created record whose attachments
// partly fail is left in place and reported with the files still missing.

use crate::cloud_storage::{ObjectStorage, StorageError};
use crate::config::{BlobKeys, DataverseInfo};
use crate::dataverse::{ImporterError, MapperError, MappingSpec, MetadataMapper, RepositoryImporter};
use crate::ingest::asset_resolver::AssetResolver;
use crate::ingest::normalizer::normalize;
use crate::ingest::publication_index::PublicationIndex;
use crate::ingest::types::{FailedAttachment, FailedItem, IngestProgress, ItemReport, RunReport};
use crate::models::{IssueRecord, PersistentId, PublicationRecord};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Storage error for {identifier}: {source}")]
    Storage {
        identifier: String,
        #[source]
        source: StorageError,
    },
    #[error("Mapping failed for {identifier}: {source}")]
    Mapper {
        identifier: String,
        #[source]
        source: MapperError,
    },
    #[error("Record creation failed for {identifier}: {source}")]
    CreateRecord {
        identifier: String,
        #[source]
        source: ImporterError,
    },
    #[error(
        "{} of {} files failed to attach to {persistent_id} ({identifier})",
        .failed.len(),
        .failed.len() + .attached
    )]
    PartialAttachment {
        identifier: String,
        persistent_id: PersistentId,
        attached: usize,
        failed: Vec<FailedAttachment>,
    },
}

/// Inputs loaded from the bucket before any issue is processed
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub spec: MappingSpec,
    pub issues: Vec<IssueRecord>,
    pub publications: PublicationIndex,
}

/// Load mapping, template, issue and newspaper JSON blobs.
pub async fn load_run_inputs(
    storage: &ObjectStorage,
    blobs: &BlobKeys,
) -> Result<RunInputs, StorageError> {
    let mapping = storage.get_json(&blobs.mapping).await?;
    let template = storage.get_json(&blobs.template).await?;
    let issues: Vec<IssueRecord> = storage.get_json(&blobs.issues).await?;
    let publication_records: Vec<PublicationRecord> =
        storage.get_json(&blobs.publications).await?;
    let publications = PublicationIndex::build(publication_records);

    info!(
        "Loaded {} issue items; {} newspaper records",
        issues.len(),
        publications.len()
    );

    Ok(RunInputs {
        spec: MappingSpec { mapping, template },
        issues,
        publications,
    })
}

/// Drives issues through normalize → resolve → map → create → attach
pub struct IngestPipeline {
    resolver: AssetResolver,
    mapper: Arc<dyn MetadataMapper>,
    importer: Arc<dyn RepositoryImporter>,
    publications: PublicationIndex,
    spec: MappingSpec,
    target: DataverseInfo,
    continue_on_error: bool,
    progress_tx: Option<mpsc::UnboundedSender<IngestProgress>>,
}

impl IngestPipeline {
    pub fn new(
        storage: ObjectStorage,
        mapper: Arc<dyn MetadataMapper>,
        importer: Arc<dyn RepositoryImporter>,
        publications: PublicationIndex,
        spec: MappingSpec,
        target: DataverseInfo,
    ) -> Self {
        Self {
            resolver: AssetResolver::new(storage),
            mapper,
            importer,
            publications,
            spec,
            target,
            continue_on_error: false,
            progress_tx: None,
        }
    }

    /// Record failed issues in the report and keep going instead of halting
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Send progress updates to `progress_tx`
    pub fn with_progress(mut self, progress_tx: mpsc::UnboundedSender<IngestProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    fn emit(&self, progress: IngestProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(progress);
        }
    }

    /// Process every issue in order.
    ///
    /// Without `continue_on_error` the first failure is returned and the
    /// remaining issues are not touched.
    pub async fn run(&self, issues: &[IssueRecord]) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();

        for (position, issue) in issues.iter().enumerate() {
            debug!("Processing issue {}/{}", position + 1, issues.len());
            match self.process_item(issue).await {
                Ok(item) => report.succeeded.push(item),
                Err(e) if self.continue_on_error => {
                    report.failed.push(FailedItem {
                        identifier: issue.identifier().to_string(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Run finished: {} ingested, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Ingest a single issue.
    pub async fn process_item(&self, issue: &IssueRecord) -> Result<ItemReport, PipelineError> {
        let identifier = issue.identifier().to_string();
        self.emit(IngestProgress::Started {
            identifier: identifier.clone(),
        });

        let result = self.ingest(issue, &identifier).await;

        match &result {
            Ok(item) => self.emit(IngestProgress::Complete {
                identifier: identifier.clone(),
                persistent_id: item.persistent_id.clone(),
                files_attached: item.files_attached,
            }),
            Err(e) => {
                error!("Ingest failed for {}: {}", issue.label(), e);
                self.emit(IngestProgress::Failed {
                    identifier: identifier.clone(),
                    error: e.to_string(),
                });
            }
        }
        result
    }

    async fn ingest(
        &self,
        issue: &IssueRecord,
        identifier: &str,
    ) -> Result<ItemReport, PipelineError> {
        // 1. Normalize
        let asset = normalize(issue, &self.publications);
        debug!("Normalized asset for {}: {:?}", identifier, asset);

        // 2. Resolve + fetch page images
        info!("Running object query for {}", issue.label());
        let storage_error = |source| PipelineError::Storage {
            identifier: identifier.to_string(),
            source,
        };
        let keys = self
            .resolver
            .resolve_keys(identifier, issue.pages.as_deref())
            .await
            .map_err(storage_error)?;
        let files = self.resolver.fetch(&keys).await.map_err(storage_error)?;
        self.emit(IngestProgress::FilesResolved {
            identifier: identifier.to_string(),
            count: files.len(),
        });

        // 3. Map
        let metadata = self
            .mapper
            .map(&asset, &self.spec)
            .await
            .map_err(|source| PipelineError::Mapper {
                identifier: identifier.to_string(),
                source,
            })?;

        // 4. Create record
        let persistent_id = self
            .importer
            .create_record(&metadata, &self.target)
            .await
            .map_err(|source| PipelineError::CreateRecord {
                identifier: identifier.to_string(),
                source,
            })?;
        self.emit(IngestProgress::RecordCreated {
            identifier: identifier.to_string(),
            persistent_id: persistent_id.clone(),
        });

        // 5. Attach files; keep going past failures so every file gets a try
        let mut attached = 0usize;
        let mut failed = Vec::new();
        for file in &files {
            match self
                .importer
                .attach_file(file, &persistent_id, &self.target)
                .await
            {
                Ok(_) => {
                    attached += 1;
                    self.emit(IngestProgress::FileAttached {
                        identifier: identifier.to_string(),
                        filename: file.filename.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Failed to attach {} to {}: {}",
                        file.filename, persistent_id, e
                    );
                    failed.push(FailedAttachment {
                        key: file.key.clone(),
                        filename: file.filename.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !failed.is_empty() {
            return Err(PipelineError::PartialAttachment {
                identifier: identifier.to_string(),
                persistent_id,
                attached,
                failed,
            });
        }

        info!(
            "Ingested {} as {} with {} files",
            identifier, persistent_id, attached
        );
        Ok(ItemReport {
            identifier: identifier.to_string(),
            persistent_id,
            files_attached: attached,
        })
    }
}
