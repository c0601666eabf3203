//! Clients for the managed services a document collection is built on.
//!
//! Each service sits behind a trait so the lifecycle manager and the query
//! engine can be driven against in-memory doubles:
//!
//! - [`BlobStorage`]: per-user containers holding the uploaded documents
//! - [`SearchIndexService`] / [`SearchIndexerService`]: index, data source,
//!   skillset and indexer provisioning on Azure AI Search
//! - [`CompletionService`]: Azure OpenAI chat completions grounded on an index
//!
//! The production implementations talk to the REST APIs directly through
//! `reqwest`.

mod blob;
mod error;
mod openai;
mod search;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
pub use blob::{AzureBlobStorage, StorageAuth, StorageConnection};
use bytes::Bytes;
pub use error::{AzureError, AzureErrorInfo, AzureErrorParser, AzureResult};
pub use openai::AzureOpenAiCompletion;
pub use search::AzureSearchClient;
use serde::{Deserialize, Serialize};

use crate::schema::{DataSourceConnection, Indexer, SearchIndex, Skillset};

/// Blob storage holding one container per user.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Create a container. Returns [`AzureError::AlreadyExists`] when it is
    /// already there.
    async fn create_container(&self, container: &str) -> AzureResult<()>;

    /// Upload a blob without overwriting. Returns
    /// [`AzureError::AlreadyExists`] and writes nothing when a blob with the
    /// same name exists.
    async fn upload_blob(&self, container: &str, blob_name: &str, content: Bytes)
    -> AzureResult<()>;

    /// Delete a container and every blob in it. Returns
    /// [`AzureError::NotFound`] when there is no such container.
    async fn delete_container(&self, container: &str) -> AzureResult<()>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// Index management on the search service.
#[async_trait]
pub trait SearchIndexService: Send + Sync {
    /// Create or update an index, returning its name.
    async fn create_or_update_index(&self, index: &SearchIndex) -> AzureResult<String>;

    async fn delete_index(&self, name: &str) -> AzureResult<()>;
}

/// Data source, skillset and indexer management on the search service.
#[async_trait]
pub trait SearchIndexerService: Send + Sync {
    async fn create_or_update_data_source(
        &self,
        data_source: &DataSourceConnection,
    ) -> AzureResult<String>;

    async fn create_or_update_skillset(&self, skillset: &Skillset) -> AzureResult<String>;

    async fn create_or_update_indexer(&self, indexer: &Indexer) -> AzureResult<String>;

    async fn delete_data_source(&self, name: &str) -> AzureResult<()>;

    async fn delete_skillset(&self, name: &str) -> AzureResult<()>;

    async fn delete_indexer(&self, name: &str) -> AzureResult<()>;
}

/// Chat completion grounded on a search index.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AzureResult<Completion>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Shape of the answer requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Strict JSON object output.
    Json,
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" | "json_object" => Ok(Self::Json),
            other => Err(format!(
                "unknown response format '{}', expected 'text' or 'json'",
                other
            )),
        }
    }
}

/// A completion call scoped to one index.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Conversation, ending with the user turn carrying the prompt.
    pub messages: Vec<ChatMessage>,
    /// OData filter restricting retrieval, if any.
    pub filter: Option<String>,
    pub index_name: String,
    pub response_format: ResponseFormat,
}

/// A source passage the model grounded its answer on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<String>,
}

/// Raw completion as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Search intent the service derived from the conversation.
    #[serde(default)]
    pub intent: Option<String>,
}
