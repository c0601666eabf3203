use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConnection {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub credentials: DataSourceCredentials,
    pub container: DataContainer,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceCredentials {
    pub connection_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContainer {
    pub name: String,
}

impl std::fmt::Debug for DataSourceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceConnection")
            .field("name", &self.name)
            .field("type", &self.source_type)
            .field("credentials", &"****")
            .field("container", &self.container)
            .finish()
    }
}

/// Build a blob data-source connection pointing at one container.
pub fn build_data_source(
    data_source_name: &str,
    container_name: &str,
    storage_connection_string: &str,
) -> DataSourceConnection {
    DataSourceConnection {
        name: data_source_name.to_string(),
        source_type: "azureblob".to_string(),
        credentials: DataSourceCredentials {
            connection_string: storage_connection_string.to_string(),
        },
        container: DataContainer {
            name: container_name.to_string(),
        },
    }
}
