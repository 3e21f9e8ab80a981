//! HTTP utilities for Artifactory REST API calls

use super::auth::Credentials;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by the HTTP layer
///
/// `NotFound` is kept apart from every other failure so callers can tell
/// "absent" from "could not ask".
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("API request failed: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status, when the registry answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::Encode(_) | Self::InvalidUrl(_) => None,
        }
    }
}

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Artifactory API calls
#[derive(Clone)]
pub struct ArtifactoryHttpClient {
    client: Client,
    credentials: Credentials,
}

impl std::fmt::Debug for ArtifactoryHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactoryHttpClient")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl ArtifactoryHttpClient {
    /// Create a new HTTP client
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("artprov/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Value, ApiError> {
        tracing::debug!("GET {}", url);
        self.execute(url, self.client.get(url)).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        tracing::debug!("PUT {}", url);
        self.execute(url, self.client.put(url).json(body)).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        tracing::debug!("POST {}", url);
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(url, request).await
    }

    /// Make a PATCH request with a YAML document body
    pub async fn patch_yaml(&self, url: &str, document: &serde_yaml::Value) -> Result<Value, ApiError> {
        tracing::debug!("PATCH {}", url);
        let body = serde_yaml::to_string(document).map_err(|e| ApiError::Encode(e.to_string()))?;
        let request = self
            .client
            .patch(url)
            .header(reqwest::header::CONTENT_TYPE, "application/yaml")
            .body(body);
        self.execute(url, request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<Value, ApiError> {
        tracing::debug!("DELETE {}", url);
        self.execute(url, self.client.delete(url)).await
    }

    async fn execute(&self, url: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = self.credentials.apply(request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Not found: {}", url);
            return Err(ApiError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            let message = sanitize_for_log(&body);
            tracing::error!("API error: {} - {}", status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_body(&body)
    }
}

/// Empty bodies become `Null`; plain-text confirmations become a JSON string
fn parse_body(body: &str) -> Result<Value, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    Ok(Value::String(trimmed.to_string()))
}

/// Format an API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_api_error(error: &ApiError) -> String {
    match error.status() {
        Some(401) => "Authentication failed. Check ARTIFACTORY_USERNAME/ARTIFACTORY_PASSWORD.".to_string(),
        Some(403) => "Permission denied. The account lacks rights for this operation.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(400) => "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(502) | Some(503) => {
            "Artifactory temporarily unavailable. Please try again.".to_string()
        }
        _ => {
            let error_str = error.to_string();
            let sanitized = error_str
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(120)
                .collect::<String>();

            if sanitized.len() < error_str.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        }
    }
}
