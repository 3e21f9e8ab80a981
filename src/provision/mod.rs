//! Provisioning engine
//!
//! Everything between a validated parameter set and the registry:
//! - `api`: the [`RegistryApi`] seam and the three-state [`Probe`]
//! - `guard`: idempotent create/delete and partial update
//! - `suffix`: environment suffix namespacing
//! - `manifest` / `runner`: declarative bulk runs

pub mod api;
pub mod guard;
pub mod manifest;
pub mod outcome;
pub mod runner;
pub mod suffix;

pub use api::{Probe, RegistryApi};
pub use guard::IdempotencyGuard;
pub use manifest::{Bucket, Manifest, ManifestEntry, ProjectManifest};
pub use outcome::{Outcome, RunReport};
pub use runner::{BulkOperation, ManifestRunner, RunAborted};
pub use suffix::{apply_suffix, apply_suffix_to_references};
