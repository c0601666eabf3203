//! Azure AI Search management client.
//!
//! Indexes, data sources, skillsets and indexers share the same REST shape:
//! `PUT /{collection}/{name}` creates or updates, `DELETE /{collection}/{name}`
//! removes, and both authenticate with the admin `api-key` header.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{AzureError, AzureResult, SearchIndexService, SearchIndexerService};
use crate::{
    config::SearchConfig,
    schema::{DataSourceConnection, Indexer, SearchIndex, Skillset},
};

/// Azure AI Search client for one search service.
pub struct AzureSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl AzureSearchClient {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: api_version.into(),
        }
    }

    pub fn from_config(client: Client, config: &SearchConfig) -> Self {
        Self::new(
            client,
            &config.endpoint,
            &config.api_key,
            &config.api_version,
        )
    }

    fn resource_url(&self, collection: &str, name: &str) -> AzureResult<String> {
        if self.endpoint.is_empty() {
            return Err(AzureError::Config(
                "search endpoint is not configured".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(AzureError::Config(
                "search api key is not configured".to_string(),
            ));
        }
        Ok(format!(
            "{}/{}/{}?api-version={}",
            self.endpoint, collection, name, self.api_version
        ))
    }

    async fn put_resource<T: Serialize + Sync>(
        &self,
        collection: &str,
        name: &str,
        body: &T,
    ) -> AzureResult<String> {
        let url = self.resource_url(collection, name)?;

        let response = self
            .client
            .put(&url)
            .header("api-key", &self.api_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AzureError::from_response(response).await);
        }

        // 204 carries no body; the name is already known
        let bytes = response.bytes().await?;
        let returned = serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|v| v["name"].as_str().map(str::to_string));

        debug!(collection, name, "Created or updated search resource");
        Ok(returned.unwrap_or_else(|| name.to_string()))
    }

    async fn delete_resource(&self, collection: &str, name: &str) -> AzureResult<()> {
        let url = self.resource_url(collection, name)?;

        let response = self
            .client
            .delete(&url)
            .header("api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AzureError::from_response(response).await);
        }

        debug!(collection, name, "Deleted search resource");
        Ok(())
    }
}

#[async_trait]
impl SearchIndexService for AzureSearchClient {
    #[instrument(skip(self, index), fields(name = %index.name))]
    async fn create_or_update_index(&self, index: &SearchIndex) -> AzureResult<String> {
        self.put_resource("indexes", &index.name, index).await
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> AzureResult<()> {
        self.delete_resource("indexes", name).await
    }
}

#[async_trait]
impl SearchIndexerService for AzureSearchClient {
    #[instrument(skip(self, data_source), fields(name = %data_source.name))]
    async fn create_or_update_data_source(
        &self,
        data_source: &DataSourceConnection,
    ) -> AzureResult<String> {
        self.put_resource("datasources", &data_source.name, data_source)
            .await
    }

    #[instrument(skip(self, skillset), fields(name = %skillset.name))]
    async fn create_or_update_skillset(&self, skillset: &Skillset) -> AzureResult<String> {
        self.put_resource("skillsets", &skillset.name, skillset)
            .await
    }

    #[instrument(skip(self, indexer), fields(name = %indexer.name))]
    async fn create_or_update_indexer(&self, indexer: &Indexer) -> AzureResult<String> {
        self.put_resource("indexers", &indexer.name, indexer).await
    }

    #[instrument(skip(self))]
    async fn delete_data_source(&self, name: &str) -> AzureResult<()> {
        self.delete_resource("datasources", name).await
    }

    #[instrument(skip(self))]
    async fn delete_skillset(&self, name: &str) -> AzureResult<()> {
        self.delete_resource("skillsets", name).await
    }

    #[instrument(skip(self))]
    async fn delete_indexer(&self, name: &str) -> AzureResult<()> {
        self.delete_resource("indexers", name).await
    }
}
