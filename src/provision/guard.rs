//! Idempotency Guard
//!
//! Probe-then-act wrappers around registry mutations. Creating something that
//! exists, or deleting something that does not, reports "unchanged" instead
//! of failing. A probe that could not reach the registry is always an error.

use super::api::{Probe, RegistryApi};
use super::outcome::Outcome;
use crate::error::{ProvisionError, Result};
use crate::resource::{Params, ResourceKind, ResourceVariant, SchemaRegistry, VariantBuilder};
use serde_json::Value;

/// Idempotent create/delete and partial update over a [`RegistryApi`]
pub struct IdempotencyGuard<'a, A: RegistryApi + ?Sized> {
    api: &'a A,
    builder: VariantBuilder<'a>,
}

impl<'a, A: RegistryApi + ?Sized> IdempotencyGuard<'a, A> {
    pub fn new(api: &'a A, registry: &'a SchemaRegistry) -> Self {
        Self {
            api,
            builder: VariantBuilder::new(registry),
        }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.builder.registry()
    }

    /// Create `key` as a `variant` resource unless it already exists
    ///
    /// `key` overrides whatever the key field of `params` holds, so callers
    /// pass the already-suffixed key here.
    pub async fn ensure_created(
        &self,
        variant: ResourceVariant,
        key: &str,
        params: &Params,
    ) -> Result<Outcome> {
        let kind = variant.kind();

        match self.api.probe(kind, key).await {
            Probe::Found(_) => {
                tracing::info!("{} {} already exists", kind, key);
                Ok(Outcome::unchanged(format!("{} {} already exists", kind, key)))
            }
            Probe::NotFound => {
                let schema = self.registry().get_schema(variant)?;
                let mut params = params.clone();
                params.insert(schema.key_field.clone(), Value::String(key.to_string()));

                let record = self.builder.build(variant, &params)?;
                let response = self
                    .api
                    .create(kind, key, &record.payload(schema))
                    .await
                    .map_err(|source| ProvisionError::CreateFailed {
                        kind,
                        key: key.to_string(),
                        source,
                    })?;

                tracing::debug!("Create response for {} {}: {}", kind, key, response);
                Ok(Outcome::changed(format!("{} {} created", kind, key)))
            }
            Probe::TransportError(source) => Err(ProvisionError::Transport {
                kind,
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Delete `key` if it exists
    pub async fn ensure_deleted(&self, kind: ResourceKind, key: &str) -> Result<Outcome> {
        match self.api.probe(kind, key).await {
            Probe::NotFound => {
                tracing::info!("{} {} not found", kind, key);
                Ok(Outcome::unchanged(format!("{} {} not found", kind, key)))
            }
            Probe::Found(_) => {
                self.api
                    .delete(kind, key)
                    .await
                    .map_err(|source| ProvisionError::DeleteFailed {
                        kind,
                        key: key.to_string(),
                        source,
                    })?;
                Ok(Outcome::changed(format!("{} {} deleted", kind, key)))
            }
            Probe::TransportError(source) => Err(ProvisionError::Transport {
                kind,
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Patch the supplied fields of an existing resource
    ///
    /// Always reports `changed`; the merged state is not compared with the
    /// fetched one.
    pub async fn update(&self, kind: ResourceKind, key: &str, params: &Params) -> Result<Outcome> {
        let current = self.api.fetch(kind, key).await.map_err(|source| {
            if source.is_not_found() {
                ProvisionError::NotFound {
                    kind,
                    key: key.to_string(),
                }
            } else {
                ProvisionError::Transport {
                    kind,
                    key: key.to_string(),
                    source,
                }
            }
        })?;

        let variant = variant_of(kind, &current)?;
        let merged = self.builder.patch(variant, &current, params)?;

        self.api
            .update(kind, key, &merged)
            .await
            .map_err(|source| ProvisionError::UpdateFailed {
                kind,
                key: key.to_string(),
                source,
            })?;

        Ok(Outcome::changed(format!("{} {} updated", kind, key)))
    }
}

/// Variant of fetched state; repositories report theirs as `rclass`
fn variant_of(kind: ResourceKind, state: &Value) -> Result<ResourceVariant> {
    if let Some(variant) = kind.sole_variant() {
        return Ok(variant);
    }

    let tag = state
        .get("rclass")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let variant: ResourceVariant = tag.parse()?;
    if variant.kind() != kind {
        return Err(ProvisionError::UnknownVariant {
            tag: tag.to_string(),
        });
    }
    Ok(variant)
}
