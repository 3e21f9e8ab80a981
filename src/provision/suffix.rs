//! Suffix namespacing
//!
//! Appending an environment suffix to every key lets the same manifest run
//! against parallel environments. Create, update and delete must call these
//! helpers with the same suffix to address the same resource.

use crate::resource::{Params, ResourceKind};
use serde_json::Value;

/// `key` unchanged for an empty suffix, else `key + suffix`
pub fn apply_suffix(key: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        key.to_string()
    } else {
        format!("{}{}", key, suffix)
    }
}

/// Suffix the references a resource holds to other suffixed resources
///
/// Permission targets name the repositories they cover, so those names get
/// the suffix too. Other kinds carry no suffixed references.
pub fn apply_suffix_to_references(kind: ResourceKind, params: &mut Params, suffix: &str) {
    if suffix.is_empty() || kind != ResourceKind::Permission {
        return;
    }

    match params.get_mut("repositories") {
        Some(Value::Array(repositories)) => {
            for repo in repositories.iter_mut() {
                if let Value::String(name) = repo {
                    *name = apply_suffix(name, suffix);
                }
            }
        }
        // Comma-separated form from the command line
        Some(Value::String(list)) => {
            *list = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| apply_suffix(name, suffix))
                .collect::<Vec<_>>()
                .join(",");
        }
        _ => {}
    }
}
