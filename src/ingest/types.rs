use crate::models::PersistentId;

/// Progress updates emitted while a run is processing issues
#[derive(Debug, Clone, PartialEq)]
pub enum IngestProgress {
    Started {
        identifier: String,
    },
    FilesResolved {
        identifier: String,
        count: usize,
    },
    RecordCreated {
        identifier: String,
        persistent_id: PersistentId,
    },
    FileAttached {
        identifier: String,
        filename: String,
    },
    Complete {
        identifier: String,
        persistent_id: PersistentId,
        files_attached: usize,
    },
    Failed {
        identifier: String,
        error: String,
    },
}

/// Outcome of one fully ingested issue
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub identifier: String,
    pub persistent_id: PersistentId,
    pub files_attached: usize,
}

/// A file that could not be attached to an already created record.
/// Kept so the upload can be retried by hand against the same DOI.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttachment {
    pub key: String,
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub identifier: String,
    pub error: String,
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub succeeded: Vec<ItemReport>,
    pub failed: Vec<FailedItem>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
