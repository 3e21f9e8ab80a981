//! Variant Builder
//!
//! Turns a loose parameter bag into a fully defaulted, type-checked
//! [`ResourceRecord`] according to the variant's schema, and applies partial
//! patches onto state fetched from the registry.

use super::registry::SchemaRegistry;
use super::schema::{FieldSchema, FieldType, OmitBehavior, VariantSchema};
use super::variant::ResourceVariant;
use crate::error::{ProvisionError, Result};
use serde_json::{Map, Value};

/// Parameter bag supplied by the CLI or a manifest entry
pub type Params = Map<String, Value>;

/// A validated resource ready to submit to the registry
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    variant: ResourceVariant,
    key: String,
    fields: Map<String, Value>,
}

impl ResourceRecord {
    pub fn variant(&self) -> ResourceVariant {
        self.variant
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value of a field by schema name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// API payload with wire names, plus `rclass` for repositories
    pub fn payload(&self, schema: &VariantSchema) -> Value {
        let mut body = Map::new();
        for field in &schema.fields {
            if let Some(value) = self.fields.get(&field.name) {
                body.insert(field.wire_name(), value.clone());
            }
        }
        if let Some(rclass) = self.variant.rclass() {
            body.insert("rclass".to_string(), Value::String(rclass.to_string()));
        }
        Value::Object(body)
    }
}

/// Builds records from parameters using the schema registry
#[derive(Debug, Clone, Copy)]
pub struct VariantBuilder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> VariantBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Build a record for `variant` from `params`
    ///
    /// Supplied fields are coerced to their schema type, omitted optional
    /// fields take the schema default. Unknown parameters and missing
    /// required fields are errors; `null` counts as omitted, and an empty
    /// string leaves a required field unpopulated.
    pub fn build(&self, variant: ResourceVariant, params: &Params) -> Result<ResourceRecord> {
        let schema = self.registry.get_schema(variant)?;
        reject_unknown(variant, schema, params)?;

        let missing = |field: &str| ProvisionError::MissingRequiredField {
            variant,
            field: field.to_string(),
        };

        let mut fields = Map::new();
        for field in &schema.fields {
            let value = match supplied(params, &field.name) {
                Some(raw) => coerce(field, raw)?,
                None if field.required => return Err(missing(&field.name)),
                None => field.default_value(),
            };
            if field.required && is_blank(&value) {
                return Err(missing(&field.name));
            }
            fields.insert(field.name.clone(), value);
        }

        let key = fields
            .get(&schema.key_field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing(&schema.key_field))?;

        Ok(ResourceRecord {
            variant,
            key,
            fields,
        })
    }

    /// Merge `params` onto the `current` state fetched from the registry
    ///
    /// Only supplied fields are written; an omitted field keeps the server
    /// value unless its schema declares `on_omit: reset`, in which case the
    /// schema default is written. The key field is never rewritten.
    pub fn patch(&self, variant: ResourceVariant, current: &Value, params: &Params) -> Result<Value> {
        let schema = self.registry.get_schema(variant)?;
        reject_unknown(variant, schema, params)?;

        let mut merged = current.as_object().cloned().unwrap_or_default();
        for field in &schema.fields {
            if field.name == schema.key_field {
                continue;
            }
            match supplied(params, &field.name) {
                Some(raw) => {
                    merged.insert(field.wire_name(), coerce(field, raw)?);
                }
                None if field.on_omit == OmitBehavior::Reset => {
                    merged.insert(field.wire_name(), field.default_value());
                }
                None => {}
            }
        }
        Ok(Value::Object(merged))
    }
}

fn supplied<'p>(params: &'p Params, name: &str) -> Option<&'p Value> {
    params.get(name).filter(|v| !v.is_null())
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

fn reject_unknown(variant: ResourceVariant, schema: &VariantSchema, params: &Params) -> Result<()> {
    match params.keys().find(|name| !schema.contains(name)) {
        Some(name) => Err(ProvisionError::UnknownField {
            variant,
            field: name.clone(),
        }),
        None => Ok(()),
    }
}

/// Coerce a raw parameter to the field's declared type
pub fn coerce(field: &FieldSchema, raw: &Value) -> Result<Value> {
    let mismatch = || ProvisionError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type,
        found: describe(raw),
    };

    match (field.field_type, raw) {
        (FieldType::String, Value::String(_)) => Ok(raw.clone()),
        (FieldType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (FieldType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

        (FieldType::Bool, Value::Bool(_)) => Ok(raw.clone()),
        (FieldType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },

        (FieldType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
        (FieldType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| mismatch()),

        (FieldType::List, Value::Array(_)) => Ok(raw.clone()),
        (FieldType::List, Value::String(s)) => Ok(Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),

        (FieldType::Map, Value::Object(_)) => Ok(raw.clone()),
        (FieldType::Map, Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => Ok(parsed),
            _ => Err(mismatch()),
        },

        _ => Err(mismatch()),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(arr) => format!("list of {} items", arr.len()),
        Value::Object(_) => "map".to_string(),
    }
}
