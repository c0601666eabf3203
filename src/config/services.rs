use serde::{Deserialize, Serialize};

/// Blob storage holding each user's uploaded documents.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage account connection string. Also handed to the search service
    /// as the data-source credential.
    #[serde(default)]
    pub connection_string: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("connection_string", &redacted(&self.connection_string))
            .finish()
    }
}

/// Azure AI Search service used for the per-user indexes.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Service endpoint, e.g. `https://my-search.search.windows.net`.
    #[serde(default)]
    pub endpoint: String,

    /// Admin API key.
    #[serde(default)]
    pub api_key: String,

    /// REST API version for index/indexer management.
    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_search_api_version(),
            timeout_secs: default_timeout(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redacted(&self.api_key))
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Azure OpenAI embedding deployment used by the skillset and the index
/// vectorizer.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Azure OpenAI (or multi-service) resource URL.
    #[serde(default)]
    pub resource_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Deployment name; also sent as the model name.
    #[serde(default)]
    pub deployment: String,

    /// Embedding vector dimensions.
    #[serde(default = "default_dimensions")]
    pub dimensions: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            resource_url: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            dimensions: default_dimensions(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("resource_url", &self.resource_url)
            .field("api_key", &redacted(&self.api_key))
            .field("deployment", &self.deployment)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// Azure OpenAI chat deployment answering questions over the index.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Azure OpenAI endpoint, e.g. `https://my-resource.openai.azure.com`.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    /// Chat deployment name.
    #[serde(default)]
    pub deployment: String,

    /// API version. "On your data" requires 2024-02-01 or later.
    #[serde(default = "default_completion_api_version")]
    pub api_version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: default_completion_api_version(),
            timeout_secs: default_timeout(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redacted(&self.api_key))
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "****" }
}

fn default_search_api_version() -> String {
    "2024-07-01".to_string()
}

fn default_completion_api_version() -> String {
    "2024-10-21".to_string()
}

fn default_dimensions() -> u32 {
    1536
}

fn default_timeout() -> u64 {
    120
}
