//! Search index definition: chunk fields plus an HNSW vector profile whose
//! vectorizer calls the Azure OpenAI embedding deployment at query time.

use serde::{Deserialize, Serialize};

pub const HNSW_ALGORITHM_NAME: &str = "myHnsw";
pub const VECTOR_PROFILE_NAME: &str = "myHnswProfile";
pub const VECTORIZER_NAME: &str = "myOpenAI";

/// Parameters for [`build_search_index`].
#[derive(Debug, Clone)]
pub struct IndexSettings<'a> {
    pub index_name: &'a str,
    pub openai_resource_url: &'a str,
    pub openai_api_key: &'a str,
    pub deployment_name: &'a str,
    pub dimensions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    pub name: String,
    pub fields: Vec<SearchField>,
    pub vector_search: VectorSearch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facetable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

impl SearchField {
    fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSearch {
    pub algorithms: Vec<VectorAlgorithm>,
    pub profiles: Vec<VectorProfile>,
    pub vectorizers: Vec<Vectorizer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorAlgorithm {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
    pub vectorizer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vectorizer {
    pub name: String,
    pub kind: String,
    #[serde(rename = "azureOpenAIParameters")]
    pub azure_open_ai_parameters: AzureOpenAiVectorizerParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOpenAiVectorizerParameters {
    pub resource_uri: String,
    pub deployment_id: String,
    pub api_key: String,
    pub model_name: String,
}

/// Build the per-user search index definition.
pub fn build_search_index(settings: &IndexSettings<'_>) -> SearchIndex {
    let fields = vec![
        SearchField::new("parent_id", "Edm.String"),
        SearchField {
            filterable: Some(true),
            ..SearchField::new("title", "Edm.String")
        },
        SearchField {
            filterable: Some(true),
            ..SearchField::new("locations", "Collection(Edm.String)")
        },
        SearchField {
            key: Some(true),
            sortable: Some(true),
            filterable: Some(true),
            facetable: Some(true),
            analyzer: Some("keyword".to_string()),
            ..SearchField::new("chunk_id", "Edm.String")
        },
        SearchField {
            sortable: Some(false),
            filterable: Some(false),
            facetable: Some(false),
            ..SearchField::new("chunk", "Edm.String")
        },
        SearchField {
            searchable: Some(true),
            dimensions: Some(settings.dimensions),
            vector_search_profile: Some(VECTOR_PROFILE_NAME.to_string()),
            ..SearchField::new("text_vector", "Collection(Edm.Single)")
        },
    ];

    let vector_search = VectorSearch {
        algorithms: vec![VectorAlgorithm {
            name: HNSW_ALGORITHM_NAME.to_string(),
            kind: "hnsw".to_string(),
        }],
        profiles: vec![VectorProfile {
            name: VECTOR_PROFILE_NAME.to_string(),
            algorithm: HNSW_ALGORITHM_NAME.to_string(),
            vectorizer: VECTORIZER_NAME.to_string(),
        }],
        vectorizers: vec![Vectorizer {
            name: VECTORIZER_NAME.to_string(),
            kind: "azureOpenAI".to_string(),
            azure_open_ai_parameters: AzureOpenAiVectorizerParameters {
                resource_uri: settings.openai_resource_url.to_string(),
                deployment_id: settings.deployment_name.to_string(),
                api_key: settings.openai_api_key.to_string(),
                model_name: settings.deployment_name.to_string(),
            },
        }],
    };

    SearchIndex {
        name: settings.index_name.to_string(),
        fields,
        vector_search,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings() -> IndexSettings<'static> {
        IndexSettings {
            index_name: "alice_index",
            openai_resource_url: "https://example.openai.azure.com",
            openai_api_key: "key",
            deployment_name: "text-embedding-3-small",
            dimensions: 1536,
        }
    }

    #[test]
    fn test_index_serializes_to_rest_shape() {
        let index = build_search_index(&settings());
        let value = serde_json::to_value(&index).unwrap();

        assert_eq!(value["name"], "alice_index");
        assert_eq!(value["fields"].as_array().unwrap().len(), 6);
        assert_eq!(
            value["fields"][3],
            json!({
                "name": "chunk_id",
                "type": "Edm.String",
                "key": true,
                "filterable": true,
                "sortable": true,
                "facetable": true,
                "analyzer": "keyword"
            })
        );
        assert_eq!(value["fields"][5]["dimensions"], 1536);
        assert_eq!(value["fields"][5]["vectorSearchProfile"], "myHnswProfile");
        assert_eq!(
            value["vectorSearch"]["vectorizers"][0]["azureOpenAIParameters"]["deploymentId"],
            "text-embedding-3-small"
        );
        assert_eq!(value["vectorSearch"]["profiles"][0]["vectorizer"], "myOpenAI");
    }

    #[test]
    fn test_title_is_filterable() {
        let index = build_search_index(&settings());
        let title = index.fields.iter().find(|f| f.name == "title").unwrap();
        assert_eq!(title.filterable, Some(true));
    }
}
