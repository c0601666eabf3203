use serde::{Deserialize, Serialize};

pub const INDEXED_FILE_EXTENSIONS: &str = ".pdf,.docx,.txt,.md,.html,.pptx";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexer {
    pub name: String,
    pub description: String,
    pub data_source_name: String,
    pub skillset_name: String,
    pub target_index_name: String,
    pub field_mappings: Vec<FieldMapping>,
    pub parameters: IndexingParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_field_name: String,
    pub target_field_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingParameters {
    pub batch_size: u32,
    pub configuration: IndexingConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingConfiguration {
    pub indexed_file_name_extensions: String,
    pub data_to_extract: String,
    pub execution_environment: String,
}

/// Build the indexer that pulls blobs through the skillset into the index.
///
/// The blob name becomes the document `title`, which is what query filters
/// match against.
pub fn build_indexer(
    indexer_name: &str,
    skillset_name: &str,
    index_name: &str,
    data_source_name: &str,
) -> Indexer {
    Indexer {
        name: indexer_name.to_string(),
        description: "Indexer to index documents and generate embeddings".to_string(),
        data_source_name: data_source_name.to_string(),
        skillset_name: skillset_name.to_string(),
        target_index_name: index_name.to_string(),
        field_mappings: vec![FieldMapping {
            source_field_name: "metadata_storage_name".to_string(),
            target_field_name: "title".to_string(),
        }],
        parameters: IndexingParameters {
            batch_size: 1,
            configuration: IndexingConfiguration {
                indexed_file_name_extensions: INDEXED_FILE_EXTENSIONS.to_string(),
                data_to_extract: "contentAndMetadata".to_string(),
                execution_environment: "private".to_string(),
            },
        },
    }
}
