//! Configuration for the document collection backend.
//!
//! Configuration is either read from a TOML file, with support for
//! environment variable interpolation using `${VAR_NAME}` syntax, or taken
//! directly from a flat set of environment variables (see [`RagConfig::from_env`]).
//!
//! Credentials are deliberately not required at load time: the lifecycle
//! manager validates the values it needs right before building a resource, so
//! a query-only process does not need embedding settings and vice versa.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! connection_string = "${AZURE_BLOB_CONNECTION_STRING}"
//!
//! [search]
//! endpoint = "https://my-search.search.windows.net"
//! api_key = "${AZURE_AI_SEARCH_API_KEY}"
//! ```

mod observability;
mod services;

use std::path::Path;

pub use observability::*;
use serde::{Deserialize, Serialize};
pub use services::*;

pub const ENV_STORAGE_CONNECTION_STRING: &str = "AZURE_BLOB_CONNECTION_STRING";
pub const ENV_SEARCH_ENDPOINT: &str = "AZURE_AI_SEARCH_ENDPOINT";
pub const ENV_SEARCH_API_KEY: &str = "AZURE_AI_SEARCH_API_KEY";
pub const ENV_EMBEDDING_RESOURCE_URL: &str = "AZURE_MULTI_OPENAI_ENDPOINT";
pub const ENV_COGNITIVE_API_KEY: &str = "AZURE_COGNITIVE_API";
pub const ENV_EMBEDDING_DEPLOYMENT: &str = "EMBEDDING_DEPLOYMENT";
pub const ENV_COMPLETION_ENDPOINT: &str = "AZURE_COGNITIVE_SERVICES_ENDPOINT";
pub const ENV_CHAT_DEPLOYMENT: &str = "CHAT_DEPLOYMENT";

/// Example configuration written by `ragdesk init`.
pub const EXAMPLE_CONFIG: &str = r#"# ragdesk configuration
#
# Values of the form ${VAR} are read from the environment when the file is loaded.

[storage]
connection_string = "${AZURE_BLOB_CONNECTION_STRING}"

[search]
endpoint = "${AZURE_AI_SEARCH_ENDPOINT}"
api_key = "${AZURE_AI_SEARCH_API_KEY}"
# api_version = "2024-07-01"

[embedding]
resource_url = "${AZURE_MULTI_OPENAI_ENDPOINT}"
api_key = "${AZURE_COGNITIVE_API}"
deployment = "${EMBEDDING_DEPLOYMENT}"
dimensions = 1536

[completion]
endpoint = "${AZURE_COGNITIVE_SERVICES_ENDPOINT}"
api_key = "${AZURE_COGNITIVE_API}"
deployment = "${CHAT_DEPLOYMENT}"
# api_version = "2024-10-21"

[observability.logging]
level = "info"
format = "compact"
"#;

/// Root configuration.
///
/// Loaded once at process start and shared read-only (behind an `Arc`) by
/// the lifecycle manager, the query engine and the service clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RagConfig {
    /// Blob storage for uploaded documents.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Azure AI Search service hosting the per-user indexes.
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding deployment used by the skillset and the index vectorizer.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat deployment answering questions.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: RagConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    ///
    /// Unset variables leave the corresponding value empty. The Cognitive
    /// Services key is shared by the embedding and completion sections.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &str| std::env::var(name).unwrap_or_default();

        let config = RagConfig {
            storage: StorageConfig {
                connection_string: var(ENV_STORAGE_CONNECTION_STRING),
            },
            search: SearchConfig {
                endpoint: var(ENV_SEARCH_ENDPOINT),
                api_key: var(ENV_SEARCH_API_KEY),
                ..Default::default()
            },
            embedding: EmbeddingConfig {
                resource_url: var(ENV_EMBEDDING_RESOURCE_URL),
                api_key: var(ENV_COGNITIVE_API_KEY),
                deployment: var(ENV_EMBEDDING_DEPLOYMENT),
                ..Default::default()
            },
            completion: CompletionConfig {
                endpoint: var(ENV_COMPLETION_ENDPOINT),
                api_key: var(ENV_COGNITIVE_API_KEY),
                deployment: var(ENV_CHAT_DEPLOYMENT),
                ..Default::default()
            },
            observability: ObservabilityConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate structural settings. Empty credentials are accepted here.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.api_version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search.api_version cannot be empty".into(),
            ));
        }
        if self.completion.api_version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "completion.api_version cannot be empty".into(),
            ));
        }
        if self.search.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Validation(
                "embedding.dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    static ENV_VAR: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").unwrap());

    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
