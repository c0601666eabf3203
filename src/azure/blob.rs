//! Azure Blob Storage over the REST API.
//!
//! Requests are authorized either with the account's shared key (HMAC-SHA256
//! over the canonicalized request) or with a SAS token appended to the query
//! string, whichever the connection string carries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use http::Method;
use sha2::Sha256;
use tracing::{debug, instrument};
use url::Url;

use super::{AzureError, AzureResult, BlobStorage};

type HmacSha256 = Hmac<Sha256>;

/// REST API version sent with every request.
const STORAGE_API_VERSION: &str = "2023-11-03";

/// How requests to the storage account are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageAuth {
    /// Decoded account key.
    SharedKey(Vec<u8>),
    /// SAS token, without the leading `?`.
    Sas(String),
}

impl std::fmt::Debug for StorageAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SharedKey(_) => f.debug_tuple("SharedKey").field(&"****").finish(),
            Self::Sas(_) => f.debug_tuple("Sas").field(&"****").finish(),
        }
    }
}

/// Parsed storage account connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConnection {
    pub account_name: String,
    pub blob_endpoint: Url,
    pub auth: StorageAuth,
}

impl StorageConnection {
    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Recognised keys: `DefaultEndpointsProtocol`, `AccountName`,
    /// `AccountKey`, `EndpointSuffix`, `BlobEndpoint` and
    /// `SharedAccessSignature`. Others are ignored.
    pub fn parse(connection_string: &str) -> AzureResult<Self> {
        let pairs: BTreeMap<&str, &str> = connection_string
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| part.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        if pairs.is_empty() {
            return Err(AzureError::Config(
                "storage connection string is empty or malformed".to_string(),
            ));
        }

        let account_name = pairs.get("AccountName").copied().unwrap_or_default();
        let protocol = pairs
            .get("DefaultEndpointsProtocol")
            .copied()
            .unwrap_or("https");
        let suffix = pairs
            .get("EndpointSuffix")
            .copied()
            .unwrap_or("core.windows.net");

        let endpoint = match pairs.get("BlobEndpoint") {
            Some(endpoint) => endpoint.to_string(),
            None if !account_name.is_empty() => {
                format!("{}://{}.blob.{}", protocol, account_name, suffix)
            }
            None => {
                return Err(AzureError::Config(
                    "storage connection string needs AccountName or BlobEndpoint".to_string(),
                ));
            }
        };
        let blob_endpoint = Url::parse(&endpoint).map_err(|e| {
            AzureError::Config(format!("invalid blob endpoint '{}': {}", endpoint, e))
        })?;

        let auth = if let Some(key) = pairs.get("AccountKey") {
            if account_name.is_empty() {
                return Err(AzureError::Config(
                    "AccountKey requires AccountName in the storage connection string".to_string(),
                ));
            }
            let key = BASE64
                .decode(key)
                .map_err(|e| AzureError::Config(format!("AccountKey is not valid base64: {}", e)))?;
            StorageAuth::SharedKey(key)
        } else if let Some(sas) = pairs.get("SharedAccessSignature") {
            StorageAuth::Sas(sas.trim_start_matches('?').to_string())
        } else {
            return Err(AzureError::Config(
                "storage connection string has neither AccountKey nor SharedAccessSignature"
                    .to_string(),
            ));
        };

        Ok(Self {
            account_name: account_name.to_string(),
            blob_endpoint,
            auth,
        })
    }
}

/// Blob storage client for one storage account.
pub struct AzureBlobStorage {
    client: reqwest::Client,
    connection: StorageConnection,
}

impl AzureBlobStorage {
    pub fn new(client: reqwest::Client, connection: StorageConnection) -> Self {
        Self { client, connection }
    }

    pub fn from_connection_string(
        client: reqwest::Client,
        connection_string: &str,
    ) -> AzureResult<Self> {
        Ok(Self::new(client, StorageConnection::parse(connection_string)?))
    }

    fn resource_url(&self, segments: &[&str], query: &[(&str, &str)]) -> AzureResult<Url> {
        let mut url = self.connection.blob_endpoint.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                AzureError::Config(format!(
                    "blob endpoint '{}' cannot be a base URL",
                    self.connection.blob_endpoint
                ))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }

        let mut query_string = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        if let StorageAuth::Sas(sas) = &self.connection.auth {
            if !query_string.is_empty() {
                query_string.push('&');
            }
            query_string.push_str(sas);
        }
        url.set_query((!query_string.is_empty()).then_some(query_string.as_str()));

        Ok(url)
    }

    /// Send a signed request. `headers` holds lowercase names.
    async fn send(
        &self,
        method: Method,
        url: Url,
        mut headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> AzureResult<reqwest::Response> {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        headers.insert("x-ms-date".to_string(), date);
        headers.insert("x-ms-version".to_string(), STORAGE_API_VERSION.to_string());

        if let StorageAuth::SharedKey(key) = &self.connection.auth {
            let to_sign = string_to_sign(
                &method,
                &url,
                &self.connection.account_name,
                &headers,
                body.len(),
            );
            let signature = BASE64.encode(hmac_sha256(key, to_sign.as_bytes()));
            headers.insert(
                "authorization".to_string(),
                format!("SharedKey {}:{}", self.connection.account_name, signature),
            );
        }

        let mut request = self.client.request(method, url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !body.is_empty() {
            request = request.body(body);
        } else {
            request = request.header(http::header::CONTENT_LENGTH, "0");
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(AzureError::from_response(response).await)
        }
    }
}

#[async_trait]
impl BlobStorage for AzureBlobStorage {
    #[instrument(skip(self), fields(account = %self.connection.account_name))]
    async fn create_container(&self, container: &str) -> AzureResult<()> {
        let url = self.resource_url(&[container], &[("restype", "container")])?;
        self.send(Method::PUT, url, BTreeMap::new(), Bytes::new())
            .await?;
        debug!(container, "Created blob container");
        Ok(())
    }

    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn upload_blob(
        &self,
        container: &str,
        blob_name: &str,
        content: Bytes,
    ) -> AzureResult<()> {
        let url = self.resource_url(&[container, blob_name], &[])?;
        let headers = BTreeMap::from([
            ("x-ms-blob-type".to_string(), "BlockBlob".to_string()),
            (
                "content-type".to_string(),
                "application/octet-stream".to_string(),
            ),
            // Never overwrite an existing blob
            ("if-none-match".to_string(), "*".to_string()),
        ]);
        self.send(Method::PUT, url, headers, content).await?;
        debug!(container, blob_name, "Uploaded blob");
        Ok(())
    }

    #[instrument(skip(self), fields(account = %self.connection.account_name))]
    async fn delete_container(&self, container: &str) -> AzureResult<()> {
        let url = self.resource_url(&[container], &[("restype", "container")])?;
        self.send(Method::DELETE, url, BTreeMap::new(), Bytes::new())
            .await?;
        debug!(container, "Deleted blob container");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "azure-blob"
    }
}

/// Build the SharedKey string-to-sign for a request.
///
/// `headers` must use lowercase names; every `x-ms-*` entry becomes part of
/// the canonicalized headers.
fn string_to_sign(
    method: &Method,
    url: &Url,
    account_name: &str,
    headers: &BTreeMap<String, String>,
    content_length: usize,
) -> String {
    let header = |name: &str| headers.get(name).map(String::as_str).unwrap_or("");
    // An empty body signs as an empty Content-Length
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut out = String::new();
    out.push_str(method.as_str());
    out.push('\n');
    for value in [
        header("content-encoding"),
        header("content-language"),
        content_length.as_str(),
        header("content-md5"),
        header("content-type"),
        // Date is carried by x-ms-date
        "",
        header("if-modified-since"),
        header("if-match"),
        header("if-none-match"),
        header("if-unmodified-since"),
        header("range"),
    ] {
        out.push_str(value);
        out.push('\n');
    }

    for (name, value) in headers.iter().filter(|(name, _)| name.starts_with("x-ms-")) {
        out.push_str(name);
        out.push(':');
        out.push_str(value.trim());
        out.push('\n');
    }

    out.push('/');
    out.push_str(account_name);
    out.push_str(url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        out.push('\n');
        out.push_str(&name);
        out.push(':');
        out.push_str(&values.join(","));
    }

    out
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
