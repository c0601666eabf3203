//! Static definitions for the Azure AI Search resources of a collection.
//!
//! These are plain data factories: given resource names and connection
//! parameters they produce the JSON bodies sent to the search service's
//! create-or-update endpoints. The lifecycle manager passes them through
//! untouched and only reads their `name`.

mod data_source;
mod index;
mod indexer;
mod skillset;

pub use data_source::{
    DataContainer, DataSourceConnection, DataSourceCredentials, build_data_source,
};
pub use index::{IndexSettings, SearchField, SearchIndex, VectorSearch, build_search_index};
pub use indexer::{INDEXED_FILE_EXTENSIONS, Indexer, build_indexer};
pub use skillset::{Skill, Skillset, SkillsetSettings, build_skillset};
