// Library exports for the houston-ingest binary and integration tests

pub mod cloud_storage;
pub mod config;
pub mod dataverse;
pub mod ingest;
pub mod models;

// Test support (unit tests, or integration tests with the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
