//! Entry points used by the application: index a batch of documents for a
//! user, ask questions over them, and remove everything when the user leaves.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::{
    azure::{
        AzureBlobStorage, AzureError, AzureOpenAiCompletion, AzureSearchClient, BlobStorage,
        CompletionService,
    },
    collection::{
        CollectionError, CollectionServices, PipelineReport, UploadOutcome, UserDocumentCollection,
    },
    config::RagConfig,
    rag::{QueryRequest, RagAnswer, RagEngine, RagError},
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("Failed to read document {path}: {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize service clients: {0}")]
    Client(#[from] AzureError),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Outcome of [`RagBackend::index_documents`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    /// Blob names written by this batch.
    pub uploaded: Vec<String>,
    /// Blob names that were already stored and left untouched.
    pub already_present: Vec<String>,
    /// Paths that are not regular files.
    pub skipped: Vec<PathBuf>,
    /// Setup pipeline results, absent when nothing new was uploaded.
    pub pipeline: Option<PipelineReport>,
}

/// Per-user RAG backend over shared service clients.
pub struct RagBackend {
    config: Arc<RagConfig>,
    services: CollectionServices,
    completion: Arc<dyn CompletionService>,
    /// Serializes indexing and deletion for the same user. Holds one entry
    /// per user id seen by this backend; entries are never removed.
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RagBackend {
    pub fn new(
        config: Arc<RagConfig>,
        services: CollectionServices,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            config,
            services,
            completion,
            user_locks: DashMap::new(),
        }
    }

    /// Build the production Azure clients from configuration.
    ///
    /// Fails when the storage connection string cannot be parsed.
    pub fn from_config(config: RagConfig) -> BackendResult<Self> {
        let timeout = Duration::from_secs(config.search.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AzureError::Request)?;

        let blob = AzureBlobStorage::from_connection_string(
            client.clone(),
            &config.storage.connection_string,
        )?;
        let search = Arc::new(AzureSearchClient::from_config(client.clone(), &config.search));
        let completion =
            AzureOpenAiCompletion::from_config(client, &config.completion, &config.search);

        info!(
            storage = blob.backend_name(),
            search_endpoint = %config.search.endpoint,
            chat_deployment = %config.completion.deployment,
            "RAG backend initialized"
        );

        let services = CollectionServices::new(Arc::new(blob), search.clone(), search);
        Ok(Self::new(Arc::new(config), services, Arc::new(completion)))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Load the handle for a user's collection. Performs no I/O.
    pub fn collection(&self, user_id: &str) -> UserDocumentCollection {
        UserDocumentCollection::load(user_id, self.services.clone(), self.config.clone())
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Upload a batch of documents and, if anything new was stored, run the
    /// setup pipeline once.
    ///
    /// Settings are validated before anything is stored. Paths are processed
    /// in sorted order. Entries that are not regular files are skipped with a
    /// warning.
    #[instrument(skip(self, paths), fields(files = paths.len()))]
    pub async fn index_documents(
        &self,
        user_id: &str,
        paths: &[PathBuf],
    ) -> BackendResult<IndexingReport> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        // A blob stored now never triggers setup again, so validate first.
        let collection = self.collection(user_id);
        collection.validate_settings()?;
        collection.ensure_container().await?;

        let mut sorted: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        sorted.sort();

        let mut report = IndexingReport::default();
        for path in sorted {
            if !is_regular_file(path).await {
                warn!(path = %path.display(), "Skipped: not a regular file");
                report.skipped.push(path.to_path_buf());
                continue;
            }

            let content = tokio::fs::read(path)
                .await
                .map_err(|source| BackendError::ReadDocument {
                    path: path.to_path_buf(),
                    source,
                })?;
            let file_name = path.to_string_lossy();
            let blob_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string());

            match collection.upload(&file_name, content).await? {
                UploadOutcome::New => report.uploaded.push(blob_name),
                UploadOutcome::AlreadyExists => report.already_present.push(blob_name),
            }
        }

        if report.uploaded.is_empty() {
            info!(
                user_id,
                already_present = report.already_present.len(),
                "All files already existed; skipping index pipeline setup"
            );
        } else {
            report.pipeline = Some(collection.setup_pipeline().await?);
        }

        Ok(report)
    }

    /// Answer a question over the user's collection.
    pub async fn query(&self, user_id: &str, request: &QueryRequest) -> BackendResult<String> {
        Ok(self.engine_for(user_id).query(request).await?)
    }

    /// Answer a question and keep the citations.
    pub async fn query_with_citations(
        &self,
        user_id: &str,
        request: &QueryRequest,
    ) -> BackendResult<RagAnswer> {
        Ok(self.engine_for(user_id).query_with_citations(request).await?)
    }

    fn engine_for(&self, user_id: &str) -> RagEngine {
        RagEngine::for_collection(self.completion.clone(), &self.collection(user_id))
    }

    /// Delete every resource of the user's collection.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> PipelineReport {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.collection(user_id).teardown_pipeline().await
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
