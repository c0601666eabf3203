//! Grounded question answering over a user's collection.
//!
//! The engine turns a [`QueryRequest`] into a single completion call: the
//! prompt template is filled with the selected file names, an OData filter
//! restricts retrieval to those files, and the answer is cleaned of citation
//! markers before it is returned.

mod engine;
mod filter;
pub mod prompts;
mod sanitize;

pub use engine::{QueryRequest, RagAnswer, RagEngine};
pub use filter::{TITLE_FIELD, build_filter, odata_escape};
pub use prompts::{DOCUMENT_METADATA_PROMPT, PromptKind, RAG_BASE_PROMPT, render_prompt};
pub use sanitize::sanitize_answer;
use thiserror::Error;

use crate::azure::AzureError;

#[derive(Debug, Error)]
pub enum RagError {
    /// The engine has no collection to query.
    #[error("RAG backend is not ready: no document collection is attached")]
    BackendNotReady,

    #[error("Completion request failed: {0}")]
    Completion(#[from] AzureError),
}

pub type RagResult<T> = Result<T, RagError>;
