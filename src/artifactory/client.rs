//! Artifactory Client
//!
//! Main client for interacting with the Artifactory REST API, combining
//! authentication, HTTP functionality and the URL layout of each resource kind.

use super::auth::Credentials;
use super::http::{ApiError, ArtifactoryHttpClient};
use crate::provision::RegistryApi;
use crate::resource::ResourceKind;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Main Artifactory client
#[derive(Debug, Clone)]
pub struct ArtifactoryClient {
    pub http: ArtifactoryHttpClient,
    base_url: Url,
}

impl ArtifactoryClient {
    /// Create a new client
    ///
    /// `redirect` is the context path Artifactory is served under
    /// (usually `artifactory`); an empty value targets the host root.
    pub fn new(
        url: &str,
        redirect: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url(url, redirect)?;
        let http = ArtifactoryHttpClient::new(credentials, timeout)?;

        tracing::debug!("Artifactory base URL: {}", base_url);
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build an API URL relative to the base URL
    pub fn api_url(&self, path: &str) -> String {
        format!("{}api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build a URL outside the REST API, relative to the base URL
    pub fn site_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Collection path of a resource kind
    pub fn kind_path(kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Repository => "repositories",
            ResourceKind::User => "security/users",
            ResourceKind::Group => "security/groups",
            ResourceKind::Permission => "security/permissions",
        }
    }

    /// URL of one resource
    pub fn resource_url(&self, kind: ResourceKind, key: &str) -> String {
        self.api_url(&format!(
            "{}/{}",
            Self::kind_path(kind),
            urlencoding::encode(key)
        ))
    }

    /// URL of a resource collection
    pub fn collection_url(&self, kind: ResourceKind) -> String {
        self.api_url(Self::kind_path(kind))
    }
}

#[async_trait]
impl RegistryApi for ArtifactoryClient {
    async fn fetch(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError> {
        self.http.get(&self.resource_url(kind, key)).await
    }

    async fn create(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError> {
        tracing::info!("Creating {} {}", kind, key);
        self.http.put(&self.resource_url(kind, key), body).await
    }

    async fn update(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError> {
        tracing::info!("Updating {} {}", kind, key);
        let url = self.resource_url(kind, key);
        match kind {
            // Permission targets are replaced wholesale
            ResourceKind::Permission => self.http.put(&url, body).await,
            _ => self.http.post(&url, Some(body)).await,
        }
    }

    async fn delete(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError> {
        tracing::info!("Deleting {} {}", kind, key);
        self.http.delete(&self.resource_url(kind, key)).await
    }
}

/// `<url>/<redirect>/`, always with a trailing slash
fn base_url(url: &str, redirect: &str) -> Result<Url, ApiError> {
    let mut raw = url.trim().trim_end_matches('/').to_string();
    let redirect = redirect.trim().trim_matches('/');
    if !redirect.is_empty() {
        raw.push('/');
        raw.push_str(redirect);
    }
    raw.push('/');

    let parsed = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ApiError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}
