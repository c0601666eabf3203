//! Skillset definition: split documents into pages, embed every page, and
//! project each page into the index as its own chunk document.

use serde::{Deserialize, Serialize};

const SPLIT_SKILL_TYPE: &str = "#Microsoft.Skills.Text.SplitSkill";
const EMBEDDING_SKILL_TYPE: &str = "#Microsoft.Skills.Text.AzureOpenAIEmbeddingSkill";

const MAXIMUM_PAGE_LENGTH: u32 = 4096;
const PAGE_OVERLAP_LENGTH: u32 = 0;
const MAXIMUM_PAGES_TO_TAKE: u32 = 2000;

/// Parameters for [`build_skillset`].
#[derive(Debug, Clone)]
pub struct SkillsetSettings<'a> {
    pub skillset_name: &'a str,
    pub index_name: &'a str,
    pub openai_resource_url: &'a str,
    pub openai_api_key: &'a str,
    pub deployment_name: &'a str,
    pub dimensions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skillset {
    pub name: String,
    pub description: String,
    pub skills: Vec<Skill>,
    pub index_projections: IndexProjections,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Skill {
    Split(SplitSkill),
    Embedding(EmbeddingSkill),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSkill {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub description: String,
    pub text_split_mode: String,
    pub context: String,
    pub maximum_page_length: u32,
    pub page_overlap_length: u32,
    pub maximum_pages_to_take: u32,
    pub inputs: Vec<InputFieldMapping>,
    pub outputs: Vec<OutputFieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSkill {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub description: String,
    pub context: String,
    pub resource_uri: String,
    pub api_key: String,
    pub deployment_id: String,
    pub model_name: String,
    pub dimensions: u32,
    pub inputs: Vec<InputFieldMapping>,
    pub outputs: Vec<OutputFieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFieldMapping {
    pub name: String,
    pub source: String,
}

impl InputFieldMapping {
    fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFieldMapping {
    pub name: String,
    pub target_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexProjections {
    pub selectors: Vec<ProjectionSelector>,
    pub parameters: ProjectionParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSelector {
    pub target_index_name: String,
    pub parent_key_field_name: String,
    pub source_context: String,
    pub mappings: Vec<InputFieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionParameters {
    pub projection_mode: String,
}

/// Build the chunking + embedding skillset for one user's index.
pub fn build_skillset(settings: &SkillsetSettings<'_>) -> Skillset {
    let split = SplitSkill {
        odata_type: SPLIT_SKILL_TYPE.to_string(),
        description: "Split skill to chunk documents".to_string(),
        text_split_mode: "pages".to_string(),
        context: "/document".to_string(),
        maximum_page_length: MAXIMUM_PAGE_LENGTH,
        page_overlap_length: PAGE_OVERLAP_LENGTH,
        maximum_pages_to_take: MAXIMUM_PAGES_TO_TAKE,
        inputs: vec![InputFieldMapping::new("text", "/document/content")],
        outputs: vec![OutputFieldMapping {
            name: "textItems".to_string(),
            target_name: "pages".to_string(),
        }],
    };

    let embedding = EmbeddingSkill {
        odata_type: EMBEDDING_SKILL_TYPE.to_string(),
        description: "Skill to generate embeddings via Azure OpenAI".to_string(),
        context: "/document/pages/*".to_string(),
        resource_uri: settings.openai_resource_url.to_string(),
        api_key: settings.openai_api_key.to_string(),
        deployment_id: settings.deployment_name.to_string(),
        model_name: settings.deployment_name.to_string(),
        dimensions: settings.dimensions,
        inputs: vec![InputFieldMapping::new("text", "/document/pages/*")],
        outputs: vec![OutputFieldMapping {
            name: "embedding".to_string(),
            target_name: "text_vector".to_string(),
        }],
    };

    let index_projections = IndexProjections {
        selectors: vec![ProjectionSelector {
            target_index_name: settings.index_name.to_string(),
            parent_key_field_name: "parent_id".to_string(),
            source_context: "/document/pages/*".to_string(),
            mappings: vec![
                InputFieldMapping::new("chunk", "/document/pages/*"),
                InputFieldMapping::new("text_vector", "/document/pages/*/text_vector"),
                InputFieldMapping::new("locations", "/document/pages/*/locations"),
                InputFieldMapping::new("title", "/document/metadata_storage_name"),
            ],
        }],
        parameters: ProjectionParameters {
            projection_mode: "skipIndexingParentDocuments".to_string(),
        },
    };

    Skillset {
        name: settings.skillset_name.to_string(),
        description: "Skillset to chunk documents and generate embeddings".to_string(),
        skills: vec![Skill::Split(split), Skill::Embedding(embedding)],
        index_projections,
    }
}
