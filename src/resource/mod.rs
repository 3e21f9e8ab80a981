//! Resource abstraction layer
//!
//! This module provides a data-driven description of registry resources.
//! Field schemas are loaded from JSON files at compile time, so a new field
//! or repository class is added by editing JSON rather than code.
//!
//! # Architecture
//!
//! - [`variant`] - Resource kinds and their concrete variants
//! - [`schema`] - Field schema types (type tag, default, wire name, omit behaviour)
//! - [`registry`] - Loads schemas from embedded JSON and merges them per kind
//! - [`builder`] - Validates parameters and produces submit-ready records
//!
//! # Schema Definitions
//!
//! Schemas are defined in JSON files under `src/resources/`:
//! - `repositories.json` - Local, remote and virtual repositories
//! - `security.json` - Users, groups and permission targets
//!
//! # Example
//!
//! ```ignore
//! use artprov::resource::{ResourceVariant, SchemaRegistry, VariantBuilder};
//!
//! let registry = SchemaRegistry::builtin()?;
//! let params = serde_json::json!({"key": "libs-local", "package_type": "maven"});
//! let record = VariantBuilder::new(&registry)
//!     .build(ResourceVariant::Local, params.as_object().unwrap())?;
//! ```

pub mod builder;
pub mod registry;
pub mod schema;
pub mod variant;

pub use builder::{coerce, Params, ResourceRecord, VariantBuilder};
pub use registry::SchemaRegistry;
pub use schema::{to_camel_case, FieldSchema, FieldType, OmitBehavior, VariantSchema};
pub use variant::{ResourceKind, ResourceVariant};
