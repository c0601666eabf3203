//! Azure OpenAI chat completions "on your data".
//!
//! Every request carries an `azure_search` data source, so the service runs
//! retrieval against the collection's index (optionally narrowed by an OData
//! filter) and returns the answer together with the passages it cited.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    AzureError, AzureResult, ChatMessage, Citation, Completion, CompletionRequest,
    CompletionService, ResponseFormat,
};
use crate::config::{CompletionConfig, SearchConfig};

/// Completion client bound to one chat deployment and one search service.
pub struct AzureOpenAiCompletion {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    timeout: Duration,
    search_endpoint: String,
    search_api_key: String,
}

impl std::fmt::Debug for AzureOpenAiCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiCompletion")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"****")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("search_endpoint", &self.search_endpoint)
            .field("search_api_key", &"****")
            .finish()
    }
}

impl AzureOpenAiCompletion {
    pub fn from_config(
        client: Client,
        completion: &CompletionConfig,
        search: &SearchConfig,
    ) -> Self {
        Self {
            client,
            endpoint: completion.endpoint.trim_end_matches('/').to_string(),
            api_key: completion.api_key.clone(),
            deployment: completion.deployment.clone(),
            api_version: completion.api_version.clone(),
            timeout: Duration::from_secs(completion.timeout_secs),
            search_endpoint: search.endpoint.trim_end_matches('/').to_string(),
            search_api_key: search.api_key.clone(),
        }
    }

    fn check_configured(&self) -> AzureResult<()> {
        for (value, key) in [
            (&self.endpoint, "completion.endpoint"),
            (&self.api_key, "completion.api_key"),
            (&self.deployment, "completion.deployment"),
        ] {
            if value.is_empty() {
                return Err(AzureError::Config(format!("{} is not configured", key)));
            }
        }
        Ok(())
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        ChatBody {
            messages: &request.messages,
            response_format: match request.response_format {
                ResponseFormat::Text => None,
                ResponseFormat::Json => Some(ResponseFormatBody {
                    format_type: "json_object",
                }),
            },
            data_sources: [DataSource {
                source_type: "azure_search",
                parameters: SearchParameters {
                    endpoint: &self.search_endpoint,
                    index_name: &request.index_name,
                    authentication: SearchAuthentication {
                        auth_type: "api_key",
                        key: &self.search_api_key,
                    },
                    fields_mapping: FieldsMapping {
                        title_field: "title",
                        filepath_field: "filepath",
                        url_field: "url",
                    },
                    filter: request.filter.as_deref(),
                    in_scope: true,
                },
            }],
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
    data_sources: [DataSource<'a>; 1],
}

#[derive(Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct DataSource<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    parameters: SearchParameters<'a>,
}

#[derive(Serialize)]
struct SearchParameters<'a> {
    endpoint: &'a str,
    index_name: &'a str,
    authentication: SearchAuthentication<'a>,
    fields_mapping: FieldsMapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    in_scope: bool,
}

#[derive(Serialize)]
struct SearchAuthentication<'a> {
    #[serde(rename = "type")]
    auth_type: &'static str,
    key: &'a str,
}

#[derive(Serialize)]
struct FieldsMapping {
    title_field: &'static str,
    filepath_field: &'static str,
    url_field: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    context: Option<MessageContext>,
}

#[derive(Deserialize)]
struct MessageContext {
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default)]
    intent: Option<String>,
}

#[async_trait]
impl CompletionService for AzureOpenAiCompletion {
    #[instrument(
        skip(self, request),
        fields(
            deployment = %self.deployment,
            index = %request.index_name,
            filtered = request.filter.is_some(),
            response_format = %request.response_format
        )
    )]
    async fn complete(&self, request: CompletionRequest) -> AzureResult<Completion> {
        self.check_configured()?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&self.build_body(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AzureError::from_response(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AzureError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AzureError::InvalidResponse("response has no choices".to_string()))?;

        let (citations, intent) = match choice.message.context {
            Some(context) => (context.citations, context.intent),
            None => (Vec::new(), None),
        };
        debug!(citations = citations.len(), "Received grounded completion");

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            citations,
            intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    use super::*;

    fn completion_for(server: &MockServer) -> AzureOpenAiCompletion {
        let completion = CompletionConfig {
            endpoint: server.uri(),
            api_key: "chat-key".to_string(),
            deployment: "gpt-4.1".to_string(),
            ..Default::default()
        };
        let search = SearchConfig {
            endpoint: "https://search.example.net".to_string(),
            api_key: "search-key".to_string(),
            ..Default::default()
        };
        AzureOpenAiCompletion::from_config(Client::new(), &completion, &search)
    }

    fn request(filter: Option<&str>, response_format: ResponseFormat) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user("Answer.\nWhat is the capital?")],
            filter: filter.map(str::to_string),
            index_name: "alice_index".to_string(),
            response_format,
        }
    }

    #[tokio::test]
    async fn test_request_carries_search_data_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1/chat/completions"))
            .and(query_param("api-version", "2024-10-21"))
            .and(header("api-key", "chat-key"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": "Answer.\nWhat is the capital?"}],
                "data_sources": [{
                    "type": "azure_search",
                    "parameters": {
                        "endpoint": "https://search.example.net",
                        "index_name": "alice_index",
                        "authentication": {"type": "api_key", "key": "search-key"},
                        "fields_mapping": {
                            "title_field": "title",
                            "filepath_field": "filepath",
                            "url_field": "url"
                        },
                        "filter": "title eq 'a.pdf'",
                        "in_scope": true
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Paris[doc1].",
                        "context": {
                            "citations": [{
                                "content": "Paris is the capital of France.",
                                "title": "a.pdf",
                                "url": null,
                                "filepath": null,
                                "chunk_id": "0"
                            }],
                            "intent": "[\"capital of France\"]"
                        }
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = completion_for(&server)
            .complete(request(Some("title eq 'a.pdf'"), ResponseFormat::Text))
            .await
            .unwrap();

        assert_eq!(completion.content, "Paris[doc1].");
        assert_eq!(completion.citations.len(), 1);
        assert_eq!(completion.citations[0].title.as_deref(), Some("a.pdf"));
        assert_eq!(completion.citations[0].chunk_id.as_deref(), Some("0"));
        assert!(completion.intent.is_some());
    }

    #[test]
    fn test_body_omits_filter_and_format_by_default() {
        let client = AzureOpenAiCompletion::from_config(
            Client::new(),
            &CompletionConfig::default(),
            &SearchConfig::default(),
        );
        let req = request(None, ResponseFormat::Text);
        let body = serde_json::to_value(client.build_body(&req)).unwrap();
        assert!(body.get("response_format").is_none());
        assert!(body["data_sources"][0]["parameters"].get("filter").is_none());
    }

    #[test]
    fn test_body_requests_json_object() {
        let client = AzureOpenAiCompletion::from_config(
            Client::new(),
            &CompletionConfig::default(),
            &SearchConfig::default(),
        );
        let req = request(None, ResponseFormat::Json);
        let body = serde_json::to_value(client.build_body(&req)).unwrap();
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[tokio::test]
    async fn test_missing_context_yields_no_citations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "No answer."}}]
            })))
            .mount(&server)
            .await;

        let completion = completion_for(&server)
            .complete(request(None, ResponseFormat::Text))
            .await
            .unwrap();
        assert_eq!(completion.content, "No answer.");
        assert!(completion.citations.is_empty());
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = completion_for(&server)
            .complete(request(None, ResponseFormat::Text))
            .await
            .unwrap_err();
        assert!(matches!(err, AzureError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": "429", "message": "Rate limit exceeded"}
            })))
            .mount(&server)
            .await;

        let err = completion_for(&server)
            .complete(request(None, ResponseFormat::Text))
            .await
            .unwrap_err();
        assert!(matches!(err, AzureError::Service { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_missing_deployment_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let completion = CompletionConfig {
            endpoint: server.uri(),
            api_key: "chat-key".to_string(),
            ..Default::default()
        };
        let search = SearchConfig::default();
        let client = AzureOpenAiCompletion::from_config(Client::new(), &completion, &search);
        let err = client
            .complete(request(None, ResponseFormat::Text))
            .await
            .unwrap_err();
        assert!(matches!(err, AzureError::Config(msg) if msg.contains("completion.deployment")));
    }
}
