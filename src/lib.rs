//! Per-user retrieval-augmented document collections on Azure.
//!
//! Each user gets an isolated blob container, search index, data source,
//! skillset and indexer. [`backend::RagBackend`] is the entry point: it
//! uploads documents, provisions the indexing pipeline when something new
//! arrives, answers grounded questions and tears everything down again.

pub mod azure;
pub mod backend;
pub mod collection;
pub mod config;
pub mod naming;
#[cfg(feature = "cli")]
pub mod observability;
pub mod rag;
pub mod schema;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

pub use backend::{BackendError, IndexingReport, RagBackend};
pub use config::RagConfig;
