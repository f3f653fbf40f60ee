// # Dataverse service clients
//
// - **MetadataMapper**: normalized asset + mapping/template -> repository metadata
// - **RepositoryImporter**: creates the dataset record, then attaches files to its DOI
//
// Both sit behind traits so the pipeline can run against in-memory fakes.

mod importer;
mod mapper;

pub use importer::{
    extract_persistent_id, HttpImporterClient, ImporterError, RepositoryImporter, UploadAck,
    IMPORTER_TIMEOUT,
};
pub use mapper::{HttpMapperClient, MapperError, MappingSpec, MetadataMapper, MAPPER_TIMEOUT};
