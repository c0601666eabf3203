//! In-memory doubles of the Azure service traits.
//!
//! [`MockAzure`] keeps containers, blobs and search resources in memory and
//! behaves like the real services for the outcomes the collection cares
//! about: "already exists" on create/upload, "not found" on delete. Every
//! call is recorded as `operation:target` so tests can assert ordering and
//! call counts.

use std::{
    collections::HashSet,
    io,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    azure::{
        AzureError, AzureResult, BlobStorage, Completion, CompletionRequest, CompletionService,
        SearchIndexService, SearchIndexerService,
    },
    collection::CollectionServices,
    config::RagConfig,
    schema::{DataSourceConnection, Indexer, SearchIndex, Skillset},
};

/// Configuration with every credential filled in.
pub fn configured() -> RagConfig {
    let mut config = RagConfig::default();
    config.storage.connection_string =
        "DefaultEndpointsProtocol=https;AccountName=testacct;AccountKey=dGVzdA==".to_string();
    config.search.endpoint = "https://search.example.net".to_string();
    config.search.api_key = "search-key".to_string();
    config.embedding.resource_url = "https://openai.example.com".to_string();
    config.embedding.api_key = "embed-key".to_string();
    config.embedding.deployment = "text-embedding-ada-002".to_string();
    config.completion.endpoint = "https://openai.example.com".to_string();
    config.completion.api_key = "chat-key".to_string();
    config.completion.deployment = "gpt-4.1".to_string();
    config
}

/// Wire one mock into all three collection service slots.
pub fn services(mock: &Arc<MockAzure>) -> CollectionServices {
    CollectionServices::new(mock.clone(), mock.clone(), mock.clone())
}

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    containers: HashSet<String>,
    blobs: HashSet<(String, String)>,
    /// `collection/name` of every search resource.
    resources: HashSet<String>,
    failing: HashSet<String>,
    writes: usize,
}

/// Recording in-memory blob storage and search service.
#[derive(Default)]
pub struct MockAzure {
    state: Mutex<MockState>,
}

impl MockAzure {
    /// Make every later call of `operation` fail with a 500.
    pub fn fail_on(&self, operation: &str) {
        self.state.lock().unwrap().failing.insert(operation.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls of `operation`.
    pub fn count(&self, operation: &str) -> usize {
        let prefix = format!("{}:", operation);
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    /// Number of blobs actually written.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn has_blob(&self, container: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .blobs
            .contains(&(container.to_string(), name.to_string()))
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state.lock().unwrap().containers.contains(container)
    }

    pub fn has_resource(&self, collection: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .resources
            .contains(&format!("{}/{}", collection, name))
    }

    fn record(&self, operation: &str, target: &str) -> AzureResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{}:{}", operation, target));
        if state.failing.contains(operation) {
            return Err(AzureError::Service {
                status: 500,
                code: "InternalError".to_string(),
                message: format!("{} failed", operation),
            });
        }
        Ok(())
    }

    fn upsert(&self, operation: &str, collection: &str, name: &str) -> AzureResult<String> {
        self.record(operation, name)?;
        self.state
            .lock()
            .unwrap()
            .resources
            .insert(format!("{}/{}", collection, name));
        Ok(name.to_string())
    }

    fn remove(&self, operation: &str, collection: &str, name: &str) -> AzureResult<()> {
        self.record(operation, name)?;
        let removed = self
            .state
            .lock()
            .unwrap()
            .resources
            .remove(&format!("{}/{}", collection, name));
        if removed {
            Ok(())
        } else {
            Err(not_found(name))
        }
    }
}

fn not_found(name: &str) -> AzureError {
    AzureError::NotFound {
        code: "ResourceNotFound".to_string(),
        message: format!("{} was not found", name),
    }
}

fn already_exists(code: &str) -> AzureError {
    AzureError::AlreadyExists {
        code: code.to_string(),
        message: "The specified resource already exists.".to_string(),
    }
}

#[async_trait]
impl BlobStorage for MockAzure {
    async fn create_container(&self, container: &str) -> AzureResult<()> {
        self.record("create_container", container)?;
        let mut state = self.state.lock().unwrap();
        if !state.containers.insert(container.to_string()) {
            return Err(already_exists("ContainerAlreadyExists"));
        }
        Ok(())
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob_name: &str,
        _content: Bytes,
    ) -> AzureResult<()> {
        self.record("upload_blob", &format!("{}/{}", container, blob_name))?;
        let mut state = self.state.lock().unwrap();
        if !state.containers.contains(container) {
            return Err(not_found(container));
        }
        if !state
            .blobs
            .insert((container.to_string(), blob_name.to_string()))
        {
            return Err(already_exists("BlobAlreadyExists"));
        }
        state.writes += 1;
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> AzureResult<()> {
        self.record("delete_container", container)?;
        let mut state = self.state.lock().unwrap();
        if !state.containers.remove(container) {
            return Err(not_found(container));
        }
        state.blobs.retain(|(c, _)| c != container);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl SearchIndexService for MockAzure {
    async fn create_or_update_index(&self, index: &SearchIndex) -> AzureResult<String> {
        self.upsert("create_or_update_index", "indexes", &index.name)
    }

    async fn delete_index(&self, name: &str) -> AzureResult<()> {
        self.remove("delete_index", "indexes", name)
    }
}

#[async_trait]
impl SearchIndexerService for MockAzure {
    async fn create_or_update_data_source(
        &self,
        data_source: &DataSourceConnection,
    ) -> AzureResult<String> {
        self.upsert(
            "create_or_update_data_source",
            "datasources",
            &data_source.name,
        )
    }

    async fn create_or_update_skillset(&self, skillset: &Skillset) -> AzureResult<String> {
        self.upsert("create_or_update_skillset", "skillsets", &skillset.name)
    }

    async fn create_or_update_indexer(&self, indexer: &Indexer) -> AzureResult<String> {
        self.upsert("create_or_update_indexer", "indexers", &indexer.name)
    }

    async fn delete_data_source(&self, name: &str) -> AzureResult<()> {
        self.remove("delete_data_source", "datasources", name)
    }

    async fn delete_skillset(&self, name: &str) -> AzureResult<()> {
        self.remove("delete_skillset", "skillsets", name)
    }

    async fn delete_indexer(&self, name: &str) -> AzureResult<()> {
        self.remove("delete_indexer", "indexers", name)
    }
}

/// Log output captured for the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route WARN and above to this buffer until the guard drops.
    ///
    /// `#[tokio::test]` runs on the current thread, so the guard covers the
    /// whole test body.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Completion service returning a canned reply and recording requests.
pub struct MockCompletion {
    reply: Mutex<Result<Completion, Option<AzureError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    /// Reply with `result`. An error is returned once, later calls get a 500.
    pub fn new(result: AzureResult<Completion>) -> Self {
        Self {
            reply: Mutex::new(result.map_err(Some)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `content` and no citations.
    pub fn answering(content: &str) -> Self {
        Self::new(Ok(Completion {
            content: content.to_string(),
            ..Default::default()
        }))
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> AzureResult<Completion> {
        self.requests.lock().unwrap().push(request);
        match &mut *self.reply.lock().unwrap() {
            Ok(completion) => Ok(completion.clone()),
            Err(error) => Err(error.take().unwrap_or(AzureError::Service {
                status: 500,
                code: "InternalServerError".to_string(),
                message: "mock completion failure".to_string(),
            })),
        }
    }
}
