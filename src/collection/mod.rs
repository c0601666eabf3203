//! Per-user document collection lifecycle.
//!
//! A collection is the set of cloud resources belonging to one user:
//!
//! 1. a blob container holding the uploaded documents
//! 2. a search index with a vectorizer for query-time embeddings
//! 3. a data-source connection pointing the search service at the container
//! 4. a skillset chunking and embedding every document
//! 5. an indexer pulling container -> skillset -> index
//!
//! [`UserDocumentCollection`] is a stateless handle: loading one performs no
//! I/O, all names are recomputed from the user id, and the container is only
//! created when [`UserDocumentCollection::ensure_container`] runs.
//!
//! The composite pipelines never fail part-way. Every step runs, and its
//! outcome is recorded in a [`PipelineReport`]. Only a missing setting aborts
//! setup, and that happens before any service is called.

mod error;
mod pipeline;

use std::{path::Path, sync::Arc, time::Instant};

use bytes::Bytes;
pub use error::{CollectionError, CollectionResult};
pub use pipeline::{PipelineReport, ResourceKind, StepOutcome, StepReport};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    azure::{AzureError, AzureResult, BlobStorage, SearchIndexService, SearchIndexerService},
    config::RagConfig,
    naming::ResourceNames,
    schema::{
        IndexSettings, SkillsetSettings, build_data_source, build_indexer, build_search_index,
        build_skillset,
    },
};

/// Reason recorded when a deletion targets a resource that does not exist.
pub const NOTHING_TO_DELETE: &str = "nothing to delete";

/// Result of a non-overwriting upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The blob was written.
    New,
    /// A blob with the same name was already stored; nothing was written.
    AlreadyExists,
}

/// Service clients a collection is provisioned through.
#[derive(Clone)]
pub struct CollectionServices {
    pub blob: Arc<dyn BlobStorage>,
    pub indexes: Arc<dyn SearchIndexService>,
    pub indexers: Arc<dyn SearchIndexerService>,
}

impl CollectionServices {
    pub fn new(
        blob: Arc<dyn BlobStorage>,
        indexes: Arc<dyn SearchIndexService>,
        indexers: Arc<dyn SearchIndexerService>,
    ) -> Self {
        Self {
            blob,
            indexes,
            indexers,
        }
    }
}

/// Handle on one user's collection.
pub struct UserDocumentCollection {
    user_id: String,
    names: ResourceNames,
    services: CollectionServices,
    config: Arc<RagConfig>,
}

impl UserDocumentCollection {
    /// Load the handle for `user_id`. No service is contacted.
    pub fn load(
        user_id: impl Into<String>,
        services: CollectionServices,
        config: Arc<RagConfig>,
    ) -> Self {
        let user_id = user_id.into();
        let names = ResourceNames::derive(&user_id);
        Self {
            user_id,
            names,
            services,
            config,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn names(&self) -> &ResourceNames {
        &self.names
    }

    /// Create the user's container unless it already exists.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn ensure_container(&self) -> CollectionResult<()> {
        let container = &self.names.container_name;
        match self.services.blob.create_container(container).await {
            Ok(()) => {
                info!(container = %container, "Created blob container");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(container = %container, "Blob container already exists");
                Ok(())
            }
            Err(source) => Err(CollectionError::Container {
                container: container.clone(),
                source,
            }),
        }
    }

    /// Store a document under its base file name, never overwriting.
    ///
    /// `file_name` may be a path; only its final component names the blob.
    /// The container must exist (see [`Self::ensure_container`]).
    #[instrument(skip(self, content), fields(user_id = %self.user_id))]
    pub async fn upload(
        &self,
        file_name: &str,
        content: impl Into<Bytes> + Send,
    ) -> CollectionResult<UploadOutcome> {
        let blob_name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CollectionError::InvalidBlobName(file_name.to_string()))?;
        let container = &self.names.container_name;

        match self
            .services
            .blob
            .upload_blob(container, blob_name, content.into())
            .await
        {
            Ok(()) => {
                info!(container = %container, blob = blob_name, "Uploaded document");
                Ok(UploadOutcome::New)
            }
            Err(e) if e.is_already_exists() => {
                info!(
                    container = %container,
                    blob = blob_name,
                    "Document already present, skipping upload"
                );
                Ok(UploadOutcome::AlreadyExists)
            }
            Err(source) => Err(CollectionError::Upload {
                container: container.clone(),
                blob: blob_name.to_string(),
                source,
            }),
        }
    }

    /// Settings for the index definition, or the first empty value.
    pub fn index_settings(&self) -> CollectionResult<IndexSettings<'_>> {
        self.check_required()?;
        let embedding = &self.config.embedding;
        Ok(IndexSettings {
            index_name: &self.names.index_name,
            openai_resource_url: &embedding.resource_url,
            openai_api_key: &embedding.api_key,
            deployment_name: &embedding.deployment,
            dimensions: embedding.dimensions,
        })
    }

    /// Settings for the skillset definition, or the first empty value.
    pub fn skillset_settings(&self) -> CollectionResult<SkillsetSettings<'_>> {
        self.check_required()?;
        let embedding = &self.config.embedding;
        Ok(SkillsetSettings {
            skillset_name: &self.names.skillset_name,
            index_name: &self.names.index_name,
            openai_resource_url: &embedding.resource_url,
            openai_api_key: &embedding.api_key,
            deployment_name: &embedding.deployment,
            dimensions: embedding.dimensions,
        })
    }

    /// Check every setting the setup pipeline needs, without calling any
    /// service.
    pub fn validate_settings(&self) -> CollectionResult<()> {
        self.index_settings()?;
        self.skillset_settings()?;
        Ok(())
    }

    fn check_required(&self) -> CollectionResult<()> {
        let config = &self.config;
        let required = [
            ("search.endpoint", &config.search.endpoint),
            ("search.api_key", &config.search.api_key),
            ("embedding.resource_url", &config.embedding.resource_url),
            ("embedding.api_key", &config.embedding.api_key),
            ("embedding.deployment", &config.embedding.deployment),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((key, _)) => Err(CollectionError::MissingConfiguration { key: *key }),
            None => Ok(()),
        }
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn create_or_update_index(&self) -> CollectionResult<StepReport> {
        let index = build_search_index(&self.index_settings()?);
        let result = self.services.indexes.create_or_update_index(&index).await;
        Ok(creation_report(ResourceKind::Index, &index.name, result))
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn create_or_update_data_source(&self) -> StepReport {
        let data_source = build_data_source(
            &self.names.data_source_name,
            &self.names.container_name,
            &self.config.storage.connection_string,
        );
        let result = self
            .services
            .indexers
            .create_or_update_data_source(&data_source)
            .await;
        creation_report(ResourceKind::DataSource, &data_source.name, result)
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn create_or_update_skillset(&self) -> CollectionResult<StepReport> {
        let skillset = build_skillset(&self.skillset_settings()?);
        let result = self
            .services
            .indexers
            .create_or_update_skillset(&skillset)
            .await;
        Ok(creation_report(ResourceKind::Skillset, &skillset.name, result))
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn create_or_update_indexer(&self) -> StepReport {
        let indexer = build_indexer(
            &self.names.indexer_name,
            &self.names.skillset_name,
            &self.names.index_name,
            &self.names.data_source_name,
        );
        let result = self
            .services
            .indexers
            .create_or_update_indexer(&indexer)
            .await;
        creation_report(ResourceKind::Indexer, &indexer.name, result)
    }

    pub async fn delete_container(&self) -> StepReport {
        let name = &self.names.container_name;
        let result = self.services.blob.delete_container(name).await;
        deletion_report(ResourceKind::Container, name, result)
    }

    pub async fn delete_index(&self) -> StepReport {
        let name = &self.names.index_name;
        let result = self.services.indexes.delete_index(name).await;
        deletion_report(ResourceKind::Index, name, result)
    }

    pub async fn delete_data_source(&self) -> StepReport {
        let name = &self.names.data_source_name;
        let result = self.services.indexers.delete_data_source(name).await;
        deletion_report(ResourceKind::DataSource, name, result)
    }

    pub async fn delete_skillset(&self) -> StepReport {
        let name = &self.names.skillset_name;
        let result = self.services.indexers.delete_skillset(name).await;
        deletion_report(ResourceKind::Skillset, name, result)
    }

    pub async fn delete_indexer(&self) -> StepReport {
        let name = &self.names.indexer_name;
        let result = self.services.indexers.delete_indexer(name).await;
        deletion_report(ResourceKind::Indexer, name, result)
    }

    /// Create or update index, data source, skillset and indexer, in that
    /// order.
    ///
    /// Index and skillset settings are both validated before the first call,
    /// so a missing value never leaves a half-provisioned collection.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn setup_pipeline(&self) -> CollectionResult<PipelineReport> {
        self.validate_settings()?;

        let start = Instant::now();
        let steps = vec![
            self.create_or_update_index().await?,
            self.create_or_update_data_source().await,
            self.create_or_update_skillset().await?,
            self.create_or_update_indexer().await,
        ];
        let report = PipelineReport {
            steps,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        log_summary("setup", &self.user_id, &report);
        Ok(report)
    }

    /// Delete every resource of the collection: container, index, data
    /// source, skillset, indexer.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn teardown_pipeline(&self) -> PipelineReport {
        let start = Instant::now();
        let steps = vec![
            self.delete_container().await,
            self.delete_index().await,
            self.delete_data_source().await,
            self.delete_skillset().await,
            self.delete_indexer().await,
        ];
        let report = PipelineReport {
            steps,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        log_summary("teardown", &self.user_id, &report);
        report
    }
}

fn creation_report(resource: ResourceKind, name: &str, result: AzureResult<String>) -> StepReport {
    match result {
        Ok(returned) => {
            info!(%resource, name = %returned, "Created or updated resource");
            StepReport::completed(resource, returned)
        }
        Err(e) => {
            error!(%resource, name, error = %e, "Failed to create or update resource");
            StepReport::failed(resource, name, e.to_string())
        }
    }
}

fn deletion_report(resource: ResourceKind, name: &str, result: AzureResult<()>) -> StepReport {
    match result {
        Ok(()) => {
            info!(%resource, name, "Deleted resource");
            StepReport::completed(resource, name)
        }
        Err(e @ AzureError::NotFound { .. }) => {
            warn!(%resource, name, error = %e, "Resource not found, nothing to delete");
            StepReport::skipped(resource, name, NOTHING_TO_DELETE)
        }
        Err(e) => {
            error!(%resource, name, error = %e, "Failed to delete resource");
            StepReport::failed(resource, name, e.to_string())
        }
    }
}

fn log_summary(pipeline: &str, user_id: &str, report: &PipelineReport) {
    let failed = report.failures().count();
    if failed == 0 {
        info!(
            pipeline,
            user_id,
            completed = report.completed_count(),
            skipped = report.skipped_count(),
            duration_ms = report.duration_ms,
            "Pipeline finished"
        );
    } else {
        warn!(
            pipeline,
            user_id,
            failed,
            completed = report.completed_count(),
            duration_ms = report.duration_ms,
            "Pipeline finished with failures"
        );
    }
}
