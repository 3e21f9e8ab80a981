//! Schema Registry - Load resource schemas from JSON
//!
//! Resource field schemas are embedded JSON documents compiled into the
//! binary. [`SchemaRegistry::builtin`] parses them once at startup and the
//! resulting registry is handed by reference to whoever needs it.

use super::schema::{FieldSchema, FieldType, VariantSchema};
use super::variant::{ResourceKind, ResourceVariant};
use crate::error::{ProvisionError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Embedded schema JSON files (compiled into the binary)
const SCHEMA_FILES: &[&str] = &[
    include_str!("../resources/repositories.json"),
    include_str!("../resources/security.json"),
];

/// Field names derived by the engine and never declared by a schema
const RESERVED_FIELDS: &[&str] = &["rclass"];

/// Root structure of resources/*.json
#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    schemas: BTreeMap<String, VariantSchema>,
}

/// Field schemas per resource variant
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<ResourceVariant, VariantSchema>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every schema embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_documents(SCHEMA_FILES)
    }

    /// Build a registry from JSON schema documents, in order
    pub fn from_documents(documents: &[&str]) -> Result<Self> {
        let mut registry = Self::new();

        for content in documents {
            let document: SchemaDocument =
                serde_json::from_str(content).map_err(|e| ProvisionError::InvalidSchema {
                    message: format!("failed to parse schema document: {}", e),
                })?;

            for (tag, schema) in document.schemas {
                let variant: ResourceVariant = tag.parse()?;
                registry.register(variant, schema)?;
            }
        }

        tracing::debug!("Schema registry loaded {} variants", registry.schemas.len());
        Ok(registry)
    }

    /// Register a variant's schema
    ///
    /// Rejects malformed schemas, a second registration of the same variant
    /// and any field whose type, default or wire name disagrees with a field
    /// of the same name in another variant of the same kind.
    pub fn register(&mut self, variant: ResourceVariant, schema: VariantSchema) -> Result<()> {
        if self.schemas.contains_key(&variant) {
            return Err(ProvisionError::DuplicateVariant { variant });
        }

        validate_schema(variant, &schema)?;

        for (other, existing) in &self.schemas {
            if other.kind() != variant.kind() {
                continue;
            }
            for field in &schema.fields {
                let Some(existing_field) = existing.field(&field.name) else {
                    continue;
                };
                if let Some(reason) = existing_field.conflict_with(field) {
                    return Err(ProvisionError::SchemaConflict {
                        field: field.name.clone(),
                        existing: *other,
                        incoming: variant,
                        reason,
                    });
                }
            }
        }

        self.schemas.insert(variant, schema);
        Ok(())
    }

    /// Get a variant's schema
    pub fn get_schema(&self, variant: ResourceVariant) -> Result<&VariantSchema> {
        self.schemas
            .get(&variant)
            .ok_or_else(|| ProvisionError::UnknownVariant {
                tag: variant.to_string(),
            })
    }

    /// Registered variants of a kind, in canonical order
    pub fn variants_of(&self, kind: ResourceKind) -> Vec<ResourceVariant> {
        kind.variants()
            .iter()
            .copied()
            .filter(|v| self.schemas.contains_key(v))
            .collect()
    }

    /// Superset of all fields across a kind's variants
    ///
    /// Fields appear in order of first declaration, walking variants in
    /// canonical order. Registration already guarantees that shared fields
    /// agree on type, default and wire name. A union field is required only
    /// when every registered variant of the kind requires it.
    pub fn union_schema(&self, kind: ResourceKind) -> Vec<FieldSchema> {
        let schemas: Vec<&VariantSchema> = self
            .variants_of(kind)
            .into_iter()
            .filter_map(|v| self.schemas.get(&v))
            .collect();

        let mut union: Vec<FieldSchema> = Vec::new();
        for schema in &schemas {
            for field in &schema.fields {
                if union.iter().any(|f| f.name == field.name) {
                    continue;
                }
                let mut merged = field.clone();
                merged.required = schemas
                    .iter()
                    .all(|s| s.field(&field.name).is_some_and(|f| f.required));
                union.push(merged);
            }
        }

        union
    }
}

fn validate_schema(variant: ResourceVariant, schema: &VariantSchema) -> Result<()> {
    let invalid = |message: String| ProvisionError::InvalidSchema {
        message: format!("{}: {}", variant, message),
    };

    let mut seen = HashSet::new();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(invalid(format!("field '{}' declared twice", field.name)));
        }
        if RESERVED_FIELDS.contains(&field.name.as_str()) {
            return Err(invalid(format!("field '{}' is reserved", field.name)));
        }
        if field.required && field.default.is_some() {
            return Err(invalid(format!(
                "required field '{}' cannot declare a default",
                field.name
            )));
        }
        if let Some(default) = &field.default {
            if !field.field_type.accepts(default) {
                return Err(invalid(format!(
                    "default for '{}' is not a {}",
                    field.name, field.field_type
                )));
            }
        }
    }

    match schema.field(&schema.key_field) {
        Some(key) if key.required && key.field_type == FieldType::String => Ok(()),
        Some(_) => Err(invalid(format!(
            "key field '{}' must be a required string",
            schema.key_field
        ))),
        None => Err(invalid(format!(
            "key field '{}' is not declared",
            schema.key_field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(fields: serde_json::Value) -> VariantSchema {
        serde_json::from_value(json!({"key_field": "key", "fields": fields})).unwrap()
    }

    #[test]
    fn test_builtin_registry_loads_successfully() {
        let registry = SchemaRegistry::builtin().expect("builtin schemas should parse");
        for kind in ResourceKind::ALL {
            for variant in kind.variants() {
                assert!(
                    registry.get_schema(*variant).is_ok(),
                    "{} should be registered",
                    variant
                );
            }
        }
    }

    #[test]
    fn test_remote_requires_url() {
        let registry = SchemaRegistry::builtin().unwrap();
        let remote = registry.get_schema(ResourceVariant::Remote).unwrap();
        assert!(remote.field("url").unwrap().required);
        assert!(registry
            .get_schema(ResourceVariant::Local)
            .unwrap()
            .field("url")
            .is_none());
    }

    #[test]
    fn test_unregistered_variant_is_unknown() {
        let registry = SchemaRegistry::new();
        let err = registry.get_schema(ResourceVariant::Local).unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownVariant { .. }));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::new();
        let s = schema(json!([{"name": "key", "type": "string", "required": true}]));
        registry.register(ResourceVariant::Local, s.clone()).unwrap();
        let err = registry.register(ResourceVariant::Local, s).unwrap_err();
        assert!(matches!(err, ProvisionError::DuplicateVariant { .. }));
    }

    #[test]
    fn test_conflicting_defaults_rejected() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                ResourceVariant::Local,
                schema(json!([
                    {"name": "key", "type": "string", "required": true},
                    {"name": "package_type", "type": "string", "default": "generic"}
                ])),
            )
            .unwrap();

        let err = registry
            .register(
                ResourceVariant::Remote,
                schema(json!([
                    {"name": "key", "type": "string", "required": true},
                    {"name": "package_type", "type": "string", "default": "maven"}
                ])),
            )
            .unwrap_err();

        match err {
            ProvisionError::SchemaConflict {
                field,
                existing,
                incoming,
                ..
            } => {
                assert_eq!(field, "package_type");
                assert_eq!(existing, ResourceVariant::Local);
                assert_eq!(incoming, ResourceVariant::Remote);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_name_in_other_kind_is_not_a_conflict() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                ResourceVariant::Local,
                schema(json!([
                    {"name": "key", "type": "string", "required": true},
                    {"name": "description", "type": "string"}
                ])),
            )
            .unwrap();
        let group: VariantSchema = serde_json::from_value(json!({
            "key_field": "name",
            "fields": [
                {"name": "name", "type": "string", "required": true},
                {"name": "description", "type": "bool"}
            ]
        }))
        .unwrap();
        assert!(registry.register(ResourceVariant::Group, group).is_ok());
    }

    #[test]
    fn test_default_type_is_checked() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register(
                ResourceVariant::Local,
                schema(json!([
                    {"name": "key", "type": "string", "required": true},
                    {"name": "handle_releases", "type": "bool", "default": "yes"}
                ])),
            )
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidSchema { .. }));
    }

    #[test]
    fn test_missing_key_field_rejected() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register(
                ResourceVariant::Local,
                schema(json!([{"name": "name", "type": "string", "required": true}])),
            )
            .unwrap_err();
        assert!(err.to_string().contains("key field 'key'"));
    }

    #[test]
    fn test_union_orders_fields_and_merges_required() {
        let registry = SchemaRegistry::builtin().unwrap();
        let union = registry.union_schema(ResourceKind::Repository);

        assert_eq!(union[0].name, "key");
        assert!(union[0].required, "key is required by every repository class");

        let url = union.iter().find(|f| f.name == "url").unwrap();
        assert!(!url.required, "url is only required for remote repositories");

        let names: Vec<&str> = union.iter().map(|f| f.name.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len(), "union must not repeat fields");
        assert!(names.contains(&"repositories"));
    }

    #[test]
    fn test_union_of_single_variant_kind() {
        let registry = SchemaRegistry::builtin().unwrap();
        let user = registry.get_schema(ResourceVariant::User).unwrap();
        assert_eq!(registry.union_schema(ResourceKind::User), user.fields);
    }
}
