//! Schema-driven provisioning for Artifactory
//!
//! - [`resource`] - resource variants, field schemas and the record builder
//! - [`provision`] - idempotency guard, suffix namespacing and manifest runs
//! - [`artifactory`] - REST client implementing the registry boundary
//! - [`config`] - persisted configuration and connection layering
//! - [`cli`] - command-line surface

pub mod artifactory;
pub mod cli;
pub mod config;
pub mod error;
pub mod provision;
pub mod resource;

pub use error::{ProvisionError, Result};
