//! Registry client boundary
//!
//! The provisioning engine talks to the registry only through [`RegistryApi`].
//! The HTTP implementation lives in [`crate::artifactory::client`]; tests use
//! an in-memory one.

use crate::artifactory::http::ApiError;
use crate::resource::ResourceKind;
use async_trait::async_trait;
use serde_json::Value;

/// Result of an existence check
#[derive(Debug)]
pub enum Probe {
    /// Resource exists; carries its current state
    Found(Value),
    NotFound,
    /// The registry could not be asked (network, auth, server error)
    TransportError(ApiError),
}

impl From<Result<Value, ApiError>> for Probe {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(state) => Self::Found(state),
            Err(err) if err.is_not_found() => Self::NotFound,
            Err(err) => Self::TransportError(err),
        }
    }
}

/// Per-kind CRUD operations on the registry
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Current state of a resource; `ApiError::NotFound` when absent
    async fn fetch(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError>;

    async fn create(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError>;

    async fn update(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError>;

    async fn delete(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError>;

    /// Existence check distinguishing absence from failure
    async fn probe(&self, kind: ResourceKind, key: &str) -> Probe {
        self.fetch(kind, key).await.into()
    }
}
