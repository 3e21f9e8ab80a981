//! Field schema definitions
//!
//! Schemas are declared in JSON under `src/resources/` and deserialized into
//! these types. Every field carries its type, default, required flag, the
//! name it uses on the wire and what an update does when it is omitted.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Type tag of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Bool,
    Int,
    List,
    Map,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::List => "list",
            Self::Map => "map",
        }
    }

    /// Value used when a field declares no default
    pub fn zero_value(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Bool => Value::Bool(false),
            Self::Int => Value::from(0),
            Self::List => Value::Array(Vec::new()),
            Self::Map => Value::Object(serde_json::Map::new()),
        }
    }

    /// Check that an already-typed JSON value has this type
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an update does with a field the caller did not supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OmitBehavior {
    /// Keep whatever the registry currently holds
    #[default]
    Keep,
    /// Overwrite with the schema default
    Reset,
}

/// One configurable field of a resource variant
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Declared default; `None` means the type's zero value
    #[serde(default)]
    pub default: Option<Value>,
    /// Name used in API payloads when it is not the camelCase of `name`
    #[serde(default)]
    pub wire: Option<String>,
    #[serde(default)]
    pub on_omit: OmitBehavior,
    #[serde(default)]
    pub help: Option<String>,
}

impl FieldSchema {
    /// Default value for an omitted optional field
    pub fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.field_type.zero_value())
    }

    /// JSON key used by the registry API
    pub fn wire_name(&self) -> String {
        self.wire
            .clone()
            .unwrap_or_else(|| to_camel_case(&self.name))
    }

    /// Fields that merge into a union must agree on everything but `required`
    pub(crate) fn conflict_with(&self, other: &FieldSchema) -> Option<String> {
        if self.field_type != other.field_type {
            return Some(format!(
                "type {} vs {}",
                self.field_type, other.field_type
            ));
        }
        if self.default_value() != other.default_value() {
            return Some(format!(
                "default {} vs {}",
                self.default_value(),
                other.default_value()
            ));
        }
        if self.wire_name() != other.wire_name() {
            return Some(format!(
                "wire name {} vs {}",
                self.wire_name(),
                other.wire_name()
            ));
        }
        None
    }
}

/// Ordered field set of one variant
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantSchema {
    /// Field holding the resource's identifying name
    pub key_field: String,
    pub fields: Vec<FieldSchema>,
}

impl VariantSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// Convert `snake_case` to `camelCase`
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("package_type"), "packageType");
        assert_eq!(to_camel_case("key"), "key");
        assert_eq!(
            to_camel_case("suppress_pom_consistency_checks"),
            "suppressPomConsistencyChecks"
        );
        assert_eq!(to_camel_case("_private"), "private");
    }

    #[test]
    fn test_field_deserializes_with_defaults() {
        let field: FieldSchema =
            serde_json::from_value(json!({"name": "handle_snapshots", "type": "bool", "default": true}))
                .unwrap();
        assert!(!field.required);
        assert_eq!(field.on_omit, OmitBehavior::Keep);
        assert_eq!(field.default_value(), json!(true));
        assert_eq!(field.wire_name(), "handleSnapshots");
    }

    #[test]
    fn test_wire_override() {
        let field: FieldSchema =
            serde_json::from_value(json!({"name": "permissions", "type": "map", "wire": "principals"}))
                .unwrap();
        assert_eq!(field.wire_name(), "principals");
        assert_eq!(field.default_value(), json!({}));
    }

    #[test]
    fn test_conflict_ignores_required_flag() {
        let a: FieldSchema =
            serde_json::from_value(json!({"name": "key", "type": "string", "required": true})).unwrap();
        let mut b = a.clone();
        b.required = false;
        assert!(a.conflict_with(&b).is_none());

        b.default = Some(json!("x"));
        assert!(a.conflict_with(&b).unwrap().starts_with("default"));
    }
}
