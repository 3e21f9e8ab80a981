//! Manifest runner
//!
//! Applies one operation to every entry of a [`Manifest`], strictly in order:
//! projects as written, buckets in [`Bucket::ORDER`], entries as written.
//! The first failing entry aborts the run; entries already applied stay
//! applied and are reported in [`RunAborted::partial`].

use super::api::RegistryApi;
use super::guard::IdempotencyGuard;
use super::manifest::{Bucket, Manifest, ManifestEntry};
use super::outcome::{Outcome, RunReport};
use super::suffix::{apply_suffix, apply_suffix_to_references};
use crate::error::ProvisionError;
use crate::resource::SchemaRegistry;
use std::fmt;
use thiserror::Error;

/// Operation applied to every manifest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Create,
    Update,
    Delete,
}

impl BulkOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bulk run stopped at a failing entry
#[derive(Debug, Error)]
#[error("Bulk {operation} aborted at project '{project}', {bucket} entry '{key}': {source}")]
pub struct RunAborted {
    pub operation: BulkOperation,
    pub project: String,
    pub bucket: Bucket,
    /// Key as addressed on the registry, suffix included
    pub key: String,
    /// Outcomes of the entries applied before the failure
    pub partial: RunReport,
    #[source]
    pub source: ProvisionError,
}

/// Sequential executor of manifest operations
pub struct ManifestRunner<'a, A: RegistryApi + ?Sized> {
    guard: IdempotencyGuard<'a, A>,
    suffix: String,
    buckets: Vec<Bucket>,
}

impl<'a, A: RegistryApi + ?Sized> ManifestRunner<'a, A> {
    pub fn new(api: &'a A, registry: &'a SchemaRegistry) -> Self {
        Self {
            guard: IdempotencyGuard::new(api, registry),
            suffix: String::new(),
            buckets: Bucket::ORDER.to_vec(),
        }
    }

    /// Suffix for entries that carry no override of their own
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Restrict the run to some buckets; traversal order stays fixed
    pub fn with_buckets(mut self, buckets: &[Bucket]) -> Self {
        self.buckets = Bucket::ORDER
            .into_iter()
            .filter(|b| buckets.contains(b))
            .collect();
        self
    }

    pub async fn run(&self, manifest: &Manifest, operation: BulkOperation) -> Result<RunReport, RunAborted> {
        let mut report = RunReport::default();

        for project in &manifest.projects {
            for &bucket in &self.buckets {
                for entry in project.entries(bucket) {
                    match self.apply(bucket, entry, operation).await {
                        Ok(outcome) => report.push(outcome),
                        Err((key, source)) => {
                            tracing::error!(
                                "Bulk {} stopped at {}/{}/{}: {}",
                                operation,
                                project.name,
                                bucket,
                                key,
                                source
                            );
                            return Err(RunAborted {
                                operation,
                                project: project.name.clone(),
                                bucket,
                                key,
                                partial: report,
                                source,
                            });
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Bulk {} finished: {} entries, changed={}",
            operation,
            report.len(),
            report.changed
        );
        Ok(report)
    }

    /// Apply one entry; on failure returns the addressed key with the error
    async fn apply(
        &self,
        bucket: Bucket,
        entry: &ManifestEntry,
        operation: BulkOperation,
    ) -> Result<Outcome, (String, ProvisionError)> {
        let variant = bucket.variant();
        let kind = variant.kind();

        let schema = self
            .guard
            .registry()
            .get_schema(variant)
            .map_err(|e| (String::new(), e))?;
        let missing = || ProvisionError::MissingRequiredField {
            variant,
            field: schema.key_field.clone(),
        };
        let key_field = schema.field(&schema.key_field).ok_or_else(|| (String::new(), missing()))?;
        let key = entry
            .key(key_field)
            .and_then(|key| key.ok_or_else(missing))
            .map_err(|e| (String::new(), e))?;

        let suffix = entry.suffix.as_deref().unwrap_or(&self.suffix);
        let key = apply_suffix(&key, suffix);
        let mut params = entry.params.clone();
        apply_suffix_to_references(kind, &mut params, suffix);

        tracing::debug!("Bulk {} {} {}", operation, kind, key);
        let result = match operation {
            BulkOperation::Create => self.guard.ensure_created(variant, &key, &params).await,
            BulkOperation::Update => self.guard.update(kind, &key, &params).await,
            BulkOperation::Delete => self.guard.ensure_deleted(kind, &key).await,
        };
        result.map_err(|e| (key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifactory::http::ApiError;
    use crate::provision::manifest::ProjectManifest;
    use crate::resource::ResourceKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Minimal in-memory registry keyed by (kind, key)
    #[derive(Default)]
    struct FakeRegistry {
        items: Mutex<BTreeMap<(String, String), Value>>,
    }

    impl FakeRegistry {
        fn contains(&self, kind: ResourceKind, key: &str) -> bool {
            self.items
                .lock()
                .unwrap()
                .contains_key(&(kind.to_string(), key.to_string()))
        }
    }

    #[async_trait]
    impl RegistryApi for FakeRegistry {
        async fn fetch(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError> {
            self.items
                .lock()
                .unwrap()
                .get(&(kind.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| ApiError::NotFound { url: key.to_string() })
        }

        async fn create(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError> {
            self.items
                .lock()
                .unwrap()
                .insert((kind.to_string(), key.to_string()), body.clone());
            Ok(Value::Null)
        }

        async fn update(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError> {
            self.create(kind, key, body).await
        }

        async fn delete(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError> {
            self.items
                .lock()
                .unwrap()
                .remove(&(kind.to_string(), key.to_string()));
            Ok(Value::Null)
        }
    }

    fn entry(value: Value) -> ManifestEntry {
        ManifestEntry::new(value.as_object().cloned().unwrap())
    }

    fn manifest() -> Manifest {
        Manifest {
            projects: vec![ProjectManifest::new("demo")
                .with_entry(Bucket::Permissions, entry(json!({"name": "readers", "repositories": ["libs"]})))
                .with_entry(Bucket::Local, entry(json!({"key": "libs"})))],
        }
    }

    #[tokio::test]
    async fn test_buckets_run_in_fixed_order() {
        let registry = SchemaRegistry::builtin().unwrap();
        let api = FakeRegistry::default();
        let runner = ManifestRunner::new(&api, &registry);

        let report = runner.run(&manifest(), BulkOperation::Create).await.unwrap();
        assert_eq!(
            report.messages(),
            vec!["Repository libs created", "Permission readers created"]
        );
        assert!(report.changed);
    }

    #[tokio::test]
    async fn test_runner_suffix_and_entry_override() {
        let registry = SchemaRegistry::builtin().unwrap();
        let api = FakeRegistry::default();
        let mut manifest = manifest();
        manifest.projects[0].local[0].suffix = Some("-own".to_string());

        let runner = ManifestRunner::new(&api, &registry).with_suffix("-qa");
        runner.run(&manifest, BulkOperation::Create).await.unwrap();

        assert!(api.contains(ResourceKind::Repository, "libs-own"));
        assert!(api.contains(ResourceKind::Permission, "readers-qa"));
        let permission = api.fetch(ResourceKind::Permission, "readers-qa").await.unwrap();
        assert_eq!(permission["repositories"], json!(["libs-qa"]));
    }

    #[tokio::test]
    async fn test_bucket_restriction() {
        let registry = SchemaRegistry::builtin().unwrap();
        let api = FakeRegistry::default();
        let runner = ManifestRunner::new(&api, &registry).with_buckets(&[Bucket::Permissions]);

        let report = runner.run(&manifest(), BulkOperation::Create).await.unwrap();
        assert_eq!(report.len(), 1);
        assert!(!api.contains(ResourceKind::Repository, "libs"));
    }

    #[tokio::test]
    async fn test_numeric_key_matches_builder() {
        let registry = SchemaRegistry::builtin().unwrap();
        let api = FakeRegistry::default();
        let manifest = Manifest {
            projects: vec![ProjectManifest::new("p").with_entry(Bucket::Local, entry(json!({"key": 2024})))],
        };

        let report = ManifestRunner::new(&api, &registry)
            .run(&manifest, BulkOperation::Create)
            .await
            .unwrap();
        assert_eq!(report.messages(), vec!["Repository 2024 created"]);
        assert!(api.contains(ResourceKind::Repository, "2024"));
    }

    #[tokio::test]
    async fn test_non_scalar_key_aborts_with_type_mismatch() {
        let registry = SchemaRegistry::builtin().unwrap();
        let api = FakeRegistry::default();
        let manifest = Manifest {
            projects: vec![ProjectManifest::new("p").with_entry(Bucket::Local, entry(json!({"key": ["a"]})))],
        };

        let err = ManifestRunner::new(&api, &registry)
            .run(&manifest, BulkOperation::Create)
            .await
            .unwrap_err();
        assert!(matches!(err.source, ProvisionError::TypeMismatch { .. }));
        assert!(err.partial.is_empty());
    }

    #[tokio::test]
    async fn test_entry_without_key_aborts() {
        let registry = SchemaRegistry::builtin().unwrap();
        let api = FakeRegistry::default();
        let manifest = Manifest {
            projects: vec![ProjectManifest::new("demo")
                .with_entry(Bucket::Local, entry(json!({"key": "libs"})))
                .with_entry(Bucket::Local, entry(json!({"description": "no key"})))],
        };

        let err = ManifestRunner::new(&api, &registry)
            .run(&manifest, BulkOperation::Create)
            .await
            .unwrap_err();
        assert_eq!(err.partial.len(), 1);
        assert!(matches!(err.source, ProvisionError::MissingRequiredField { .. }));
    }
}
