use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use super::{
    RagError, RagResult, build_filter, prompts::RAG_BASE_PROMPT, render_prompt, sanitize_answer,
};
use crate::{
    azure::{ChatMessage, Citation, CompletionRequest, CompletionService, ResponseFormat},
    collection::UserDocumentCollection,
};

/// A question scoped to zero or more uploaded files.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub question: String,
    /// Instructions placed before the question; may contain `{selected_file}`.
    pub prompt_template: String,
    /// Blob names to restrict retrieval to. Empty means the whole collection.
    pub selected_files: Vec<String>,
    /// Earlier turns of the conversation, oldest first.
    pub history: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            prompt_template: RAG_BASE_PROMPT.to_string(),
            selected_files: Vec::new(),
            history: Vec::new(),
            response_format: ResponseFormat::Text,
        }
    }

    pub fn with_prompt(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_selected_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }
}

/// Cleaned answer plus the passages it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub intent: Option<String>,
}

/// Query engine for one collection.
pub struct RagEngine {
    completion: Arc<dyn CompletionService>,
    index_name: Option<String>,
}

impl RagEngine {
    /// Create an engine with no collection attached. Queries fail with
    /// [`RagError::BackendNotReady`] until [`Self::attach`] is called.
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            index_name: None,
        }
    }

    pub fn for_collection(
        completion: Arc<dyn CompletionService>,
        collection: &UserDocumentCollection,
    ) -> Self {
        let mut engine = Self::new(completion);
        engine.attach(collection);
        engine
    }

    pub fn attach(&mut self, collection: &UserDocumentCollection) {
        self.index_name = Some(collection.names().index_name.clone());
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Answer a question, returning only the cleaned text.
    pub async fn query(&self, request: &QueryRequest) -> RagResult<String> {
        Ok(self.query_with_citations(request).await?.answer)
    }

    /// Answer a question, keeping the citations returned by the service.
    #[instrument(
        skip(self, request),
        fields(
            index = ?self.index_name,
            selected = request.selected_files.len(),
            history = request.history.len()
        )
    )]
    pub async fn query_with_citations(&self, request: &QueryRequest) -> RagResult<RagAnswer> {
        let index_name = self.index_name.clone().ok_or(RagError::BackendNotReady)?;

        let completion_request = self.build_request(request, index_name);
        debug!(filter = ?completion_request.filter, "Sending grounded completion request");

        let completion = self.completion.complete(completion_request).await?;

        Ok(RagAnswer {
            answer: sanitize_answer(&completion.content),
            citations: completion.citations,
            intent: completion.intent,
        })
    }

    fn build_request(&self, request: &QueryRequest, index_name: String) -> CompletionRequest {
        let prompt = render_prompt(&request.prompt_template, &request.selected_files);

        let mut messages = request.history.clone();
        messages.push(ChatMessage::user(format!("{}\n{}", prompt, request.question)));

        CompletionRequest {
            messages,
            filter: build_filter(&request.selected_files),
            index_name,
            response_format: request.response_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        azure::{AzureError, Completion, Role},
        test_utils::{MockAzure, MockCompletion, configured, services},
    };

    fn attached_engine(completion: Arc<MockCompletion>) -> RagEngine {
        let mock = Arc::new(MockAzure::default());
        let collection =
            UserDocumentCollection::load("alice", services(&mock), Arc::new(configured()));
        RagEngine::for_collection(completion, &collection)
    }

    #[tokio::test]
    async fn test_unattached_engine_is_not_ready() {
        let completion = Arc::new(MockCompletion::answering("unused"));
        let engine = RagEngine::new(completion.clone());

        let err = engine.query(&QueryRequest::new("hi")).await.unwrap_err();

        assert!(matches!(err, RagError::BackendNotReady));
        assert!(completion.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_sanitizes_answer() {
        let completion = Arc::new(MockCompletion::answering(
            "Paris is the capital[doc1] .  It has many museums[doc12].",
        ));
        let engine = attached_engine(completion.clone());

        let answer = engine
            .query(&QueryRequest::new("What is the capital?"))
            .await
            .unwrap();

        assert_eq!(answer, "Paris is the capital. It has many museums.");
    }

    #[tokio::test]
    async fn test_request_carries_prompt_filter_and_index() {
        let completion = Arc::new(MockCompletion::answering("ok"));
        let engine = attached_engine(completion.clone());

        let request = QueryRequest::new("Summarize.")
            .with_prompt("Use {selected_file}.")
            .with_selected_files(["a.pdf", "b's.pdf"])
            .with_response_format(ResponseFormat::Json);
        engine.query(&request).await.unwrap();

        let sent = completion.requests();
        assert_eq!(sent.len(), 1);
        let sent = &sent[0];
        assert_eq!(sent.index_name, "alice_index");
        assert_eq!(
            sent.filter.as_deref(),
            Some("(title eq 'a.pdf' or title eq 'b''s.pdf')")
        );
        assert_eq!(sent.response_format, ResponseFormat::Json);
        assert_eq!(
            sent.messages,
            vec![ChatMessage::user("Use a.pdf, b's.pdf.\nSummarize.")]
        );
    }

    #[tokio::test]
    async fn test_no_selection_sends_no_filter() {
        let completion = Arc::new(MockCompletion::answering("ok"));
        let engine = attached_engine(completion.clone());

        engine.query(&QueryRequest::new("Anything?")).await.unwrap();

        let sent = completion.requests();
        assert_eq!(sent[0].filter, None);
        assert_eq!(
            sent[0].messages[0].content,
            format!("{}\nAnything?", RAG_BASE_PROMPT)
        );
    }

    #[tokio::test]
    async fn test_history_precedes_question() {
        let completion = Arc::new(MockCompletion::answering("ok"));
        let engine = attached_engine(completion.clone());

        let request = QueryRequest::new("And the second?").with_history(vec![
            ChatMessage::user("What is the first?"),
            ChatMessage::assistant("The first is A."),
        ]);
        engine.query(&request).await.unwrap();

        let messages = &completion.requests()[0].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "What is the first?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(messages[2].content.ends_with("\nAnd the second?"));
    }

    #[tokio::test]
    async fn test_citations_are_passed_through() {
        let completion = Arc::new(MockCompletion::new(Ok(Completion {
            content: "Answer[doc1].".to_string(),
            citations: vec![Citation {
                content: "passage".to_string(),
                title: Some("a.pdf".to_string()),
                ..Default::default()
            }],
            intent: Some("intent".to_string()),
        })));
        let engine = attached_engine(completion);

        let answer = engine
            .query_with_citations(&QueryRequest::new("q"))
            .await
            .unwrap();

        assert_eq!(answer.answer, "Answer.");
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].title.as_deref(), Some("a.pdf"));
        assert_eq!(answer.intent.as_deref(), Some("intent"));
    }

    #[tokio::test]
    async fn test_completion_error_propagates() {
        let completion = Arc::new(MockCompletion::new(Err(AzureError::Config(
            "completion.deployment is not configured".to_string(),
        ))));
        let engine = attached_engine(completion);

        let err = engine.query(&QueryRequest::new("q")).await.unwrap_err();
        assert!(matches!(err, RagError::Completion(AzureError::Config(_))));
    }
}
