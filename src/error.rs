//! Error types for the provisioning engine

use crate::artifactory::http::ApiError;
use crate::resource::{FieldType, ResourceKind, ResourceVariant};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors raised while building, validating or applying a resource
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Unknown resource variant: {tag}")]
    UnknownVariant { tag: String },

    #[error("Resource variant {variant} is already registered")]
    DuplicateVariant { variant: ResourceVariant },

    #[error("Field '{field}' conflicts between {existing} and {incoming}: {reason}")]
    SchemaConflict {
        field: String,
        existing: ResourceVariant,
        incoming: ResourceVariant,
        reason: String,
    },

    #[error("Invalid schema definition: {message}")]
    InvalidSchema { message: String },

    #[error("Field '{field}' is not accepted by {variant} resources")]
    UnknownField {
        variant: ResourceVariant,
        field: String,
    },

    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: String,
    },

    #[error("Missing required field '{field}' for {variant} resource")]
    MissingRequiredField {
        variant: ResourceVariant,
        field: String,
    },

    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: String },

    #[error("Failed to reach registry for {kind} {key}: {source}")]
    Transport {
        kind: ResourceKind,
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to create {kind} {key}: {source}")]
    CreateFailed {
        kind: ResourceKind,
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to update {kind} {key}: {source}")]
    UpdateFailed {
        kind: ResourceKind,
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to delete {kind} {key}: {source}")]
    DeleteFailed {
        kind: ResourceKind,
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },
}
