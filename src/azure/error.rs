//! Unified error handling for the Azure service clients.
//!
//! Blob Storage, AI Search and Azure OpenAI all report failures differently:
//! Blob Storage sends an XML body plus an `x-ms-error-code` header, the other
//! two send a JSON `{"error": {"code", "message"}}` body. [`AzureErrorParser`]
//! folds all three into [`AzureErrorInfo`], and [`AzureError::from_info`]
//! classifies the benign outcomes (`AlreadyExists`, `NotFound`) that the
//! collection lifecycle treats as normal results.

use std::sync::LazyLock;

use http::StatusCode;
use regex::Regex;
use thiserror::Error;

static XML_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Code>\s*([^<]*?)\s*</Code>").unwrap());
static XML_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Message>\s*(.*?)\s*</Message>").unwrap());

/// Errors returned by the Azure service clients.
#[derive(Debug, Error)]
pub enum AzureError {
    /// The resource (container, blob) already exists.
    #[error("Resource already exists ({code}): {message}")]
    AlreadyExists { code: String, message: String },

    /// The targeted resource does not exist.
    #[error("Resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// Any other non-success response from the service.
    #[error("Service returned {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid service response: {0}")]
    InvalidResponse(String),
}

pub type AzureResult<T> = Result<T, AzureError>;

impl AzureError {
    /// Classify parsed error information into an error variant.
    pub fn from_info(info: AzureErrorInfo) -> Self {
        let AzureErrorInfo {
            status,
            code,
            message,
        } = info;

        if status == StatusCode::NOT_FOUND || code.ends_with("NotFound") {
            return Self::NotFound { code, message };
        }

        let conflict = status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED;
        if conflict && (code.ends_with("AlreadyExists") || code == "ConditionNotMet") {
            return Self::AlreadyExists { code, message };
        }

        Self::Service {
            status: status.as_u16(),
            code,
            message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Read an unsuccessful response and convert it into an error.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Self::Request(e),
        };
        Self::from_info(AzureErrorParser::parse_error(status, &headers, &body))
    }
}

/// Error information extracted from an Azure error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureErrorInfo {
    pub status: StatusCode,
    /// Service error code, e.g. `ContainerAlreadyExists` or `IndexNotFound`.
    pub code: String,
    pub message: String,
}

/// Parser for Azure error responses.
///
/// The error code is taken from the `x-ms-error-code` header when present,
/// falling back to the body. JSON bodies are tried before XML ones.
pub struct AzureErrorParser;

impl AzureErrorParser {
    pub fn parse_error(
        status: StatusCode,
        headers: &http::HeaderMap,
        body: &[u8],
    ) -> AzureErrorInfo {
        let header_code = headers
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (body_code, message) = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(json) => {
                let error_obj = &json["error"];
                (
                    error_obj["code"].as_str().map(str::to_string),
                    error_obj["message"].as_str().map(str::to_string),
                )
            }
            Err(_) => {
                let text = String::from_utf8_lossy(body);
                let code = XML_CODE.captures(&text).map(|c| c[1].to_string());
                let message = XML_MESSAGE
                    .captures(&text)
                    .map(|c| c[1].to_string())
                    .or_else(|| {
                        let trimmed = text.trim();
                        (!trimmed.is_empty()).then(|| trimmed.to_string())
                    });
                (code, message)
            }
        };

        let code = header_code
            .or(body_code)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .replace(' ', "")
            });

        AzureErrorInfo {
            status,
            code,
            message: message.unwrap_or_else(|| format!("Azure service returned {}", status)),
        }
    }
}
