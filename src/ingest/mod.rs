// # Ingest Module
//
// Per-issue ingestion into Dataverse, split into small testable pieces:
//
// - **Normalizer**: issue row → canonical metadata (pure, never fails)
// - **PublicationIndex**: newspaper-level rows keyed by identifier, for abstracts
// - **AssetResolver**: lists and downloads the page images under an issue's prefix
// - **IngestPipeline**: sequences normalize → resolve → map → create → attach
//
// Public API:
// - `IngestPipeline`: process one issue or a whole run
// - `load_run_inputs`: pull mapping/template/issue/newspaper JSON from the bucket
// - `IngestProgress`: progress updates
// - `RunReport`: per-run outcome

mod asset_resolver;
mod normalizer;
mod pipeline;
mod publication_index;
mod types;

pub use asset_resolver::{filename_for_key, AssetResolver};
pub use normalizer::{normalize, separate_list};
pub use pipeline::{load_run_inputs, IngestPipeline, PipelineError, RunInputs};
pub use publication_index::{PublicationIndex, PLACEHOLDER};
pub use types::{FailedAttachment, FailedItem, IngestProgress, ItemReport, RunReport};
