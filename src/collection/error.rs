use thiserror::Error;

use crate::azure::AzureError;

/// Errors raised by collection operations that cannot be recorded as a
/// pipeline step.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A setting needed to build a resource definition is empty.
    #[error("Missing configuration value: {key}")]
    MissingConfiguration { key: &'static str },

    #[error("Failed to provision container {container}: {source}")]
    Container {
        container: String,
        #[source]
        source: AzureError,
    },

    #[error("Failed to upload {blob} to container {container}: {source}")]
    Upload {
        container: String,
        blob: String,
        #[source]
        source: AzureError,
    },

    #[error("Cannot derive a blob name from '{0}'")]
    InvalidBlobName(String),
}

pub type CollectionResult<T> = Result<T, CollectionError>;
