//! Declarative manifest
//!
//! A manifest describes many resources grouped by project:
//!
//! ```yaml
//! projects:
//!   silicon_valley:
//!     artifactory:
//!       repositories:
//!         local:
//!           - key: "silicon_valley-local1-repo"
//!             package_type: "maven"
//!         remote:
//!           - key: "silicon_valley-remote1-repo"
//!             url: "http://hub.docker.com"
//!         virtual:
//!           - key: "silicon_valley-virtual1-repo"
//!             repositories: ["silicon_valley-local1-repo"]
//!       permissions:
//!         - name: "silicon_valley-readers"
//!           repositories: ["silicon_valley-local1-repo"]
//! ```
//!
//! The YAML is parsed once into an ordered, typed [`Manifest`]. Services other
//! than `artifactory` are skipped so one file can serve several tools.

use crate::error::{ProvisionError, Result};
use crate::resource::{coerce, FieldSchema, Params, ResourceVariant};
use serde_json::Value;
use serde_yaml::Mapping;
use std::fmt;
use std::path::Path;

/// Service section this tool reads
pub const SERVICE: &str = "artifactory";

/// Entry key overriding the run-wide suffix
pub const SUFFIX_KEY: &str = "suffix";

/// Resource-type bucket inside a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Local,
    Remote,
    Virtual,
    Permissions,
}

impl Bucket {
    /// Traversal order of a run
    pub const ORDER: [Bucket; 4] = [Bucket::Local, Bucket::Remote, Bucket::Virtual, Bucket::Permissions];

    pub const REPOSITORIES: [Bucket; 3] = [Bucket::Local, Bucket::Remote, Bucket::Virtual];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Virtual => "virtual",
            Self::Permissions => "permissions",
        }
    }

    /// Variant every entry of the bucket is built as
    pub fn variant(self) -> ResourceVariant {
        match self {
            Self::Local => ResourceVariant::Local,
            Self::Remote => ResourceVariant::Remote,
            Self::Virtual => ResourceVariant::Virtual,
            Self::Permissions => ResourceVariant::Permission,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resource of a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub params: Params,
    /// Replaces the run-wide suffix for this entry
    pub suffix: Option<String>,
}

impl ManifestEntry {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            suffix: None,
        }
    }

    /// Unsuffixed key, coerced through the key field's schema
    ///
    /// `Ok(None)` when the key is absent, `null` or empty.
    pub fn key(&self, key_field: &FieldSchema) -> Result<Option<String>> {
        let Some(raw) = self.params.get(&key_field.name).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        Ok(coerce(key_field, raw)?
            .as_str()
            .filter(|k| !k.is_empty())
            .map(str::to_string))
    }
}

/// Buckets of one project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectManifest {
    pub name: String,
    pub local: Vec<ManifestEntry>,
    pub remote: Vec<ManifestEntry>,
    pub r#virtual: Vec<ManifestEntry>,
    pub permissions: Vec<ManifestEntry>,
}

impl ProjectManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn entries(&self, bucket: Bucket) -> &[ManifestEntry] {
        match bucket {
            Bucket::Local => &self.local,
            Bucket::Remote => &self.remote,
            Bucket::Virtual => &self.r#virtual,
            Bucket::Permissions => &self.permissions,
        }
    }

    fn entries_mut(&mut self, bucket: Bucket) -> &mut Vec<ManifestEntry> {
        match bucket {
            Bucket::Local => &mut self.local,
            Bucket::Remote => &mut self.remote,
            Bucket::Virtual => &mut self.r#virtual,
            Bucket::Permissions => &mut self.permissions,
        }
    }

    /// Builder-style helper for assembling manifests in code
    pub fn with_entry(mut self, bucket: Bucket, entry: ManifestEntry) -> Self {
        self.entries_mut(bucket).push(entry);
        self
    }
}

/// Parsed manifest, projects in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub projects: Vec<ProjectManifest>,
}

impl Manifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProvisionError::InvalidManifest {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| invalid(format!("failed to parse YAML: {}", e)))?;

        let projects = match root.get("projects") {
            Some(serde_yaml::Value::Mapping(projects)) => projects,
            Some(serde_yaml::Value::Null) => return Ok(Self::default()),
            Some(_) => return Err(invalid("'projects' must be a mapping")),
            None => return Err(invalid("missing top-level 'projects'")),
        };

        let mut manifest = Self::default();
        for (name, services) in projects {
            let name = scalar_name(name, "project name")?;
            manifest.projects.push(parse_project(&name, services)?);
        }

        tracing::debug!("Manifest parsed: {} projects", manifest.projects.len());
        Ok(manifest)
    }

    /// Total number of entries in the given buckets
    pub fn entry_count(&self, buckets: &[Bucket]) -> usize {
        self.projects
            .iter()
            .flat_map(|p| buckets.iter().map(move |b| p.entries(*b).len()))
            .sum()
    }
}

fn parse_project(name: &str, services: &serde_yaml::Value) -> Result<ProjectManifest> {
    let mut project = ProjectManifest::new(name);

    let services = match services {
        serde_yaml::Value::Mapping(services) => services,
        serde_yaml::Value::Null => return Ok(project),
        _ => return Err(invalid(format!("project '{}' must be a mapping", name))),
    };

    for (service, section) in services {
        let service = scalar_name(service, "service name")?;
        if service != SERVICE {
            tracing::debug!("Skipping service '{}' in project '{}'", service, name);
            continue;
        }
        let Some(section) = as_mapping(section, name, SERVICE)? else {
            continue;
        };

        if let Some(repositories) = section.get("repositories") {
            if let Some(repositories) = as_mapping(repositories, name, "repositories")? {
                for (bucket, entries) in repositories {
                    let bucket = match scalar_name(bucket, "bucket name")?.as_str() {
                        "local" => Bucket::Local,
                        "remote" => Bucket::Remote,
                        "virtual" => Bucket::Virtual,
                        other => {
                            return Err(invalid(format!(
                                "project '{}': unknown repository bucket '{}'",
                                name, other
                            )))
                        }
                    };
                    let parsed = parse_entries(entries, name, bucket)?;
                    project.entries_mut(bucket).extend(parsed);
                }
            }
        }

        if let Some(permissions) = section.get("permissions") {
            project.permissions = parse_entries(permissions, name, Bucket::Permissions)?;
        }
    }

    Ok(project)
}

fn parse_entries(value: &serde_yaml::Value, project: &str, bucket: Bucket) -> Result<Vec<ManifestEntry>> {
    let items = match value {
        serde_yaml::Value::Sequence(items) => items,
        serde_yaml::Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(invalid(format!(
                "project '{}': bucket '{}' must be a list",
                project, bucket
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let json = serde_json::to_value(item).map_err(|e| {
                invalid(format!("project '{}': {}[{}]: {}", project, bucket, index, e))
            })?;
            let Value::Object(mut params) = json else {
                return Err(invalid(format!(
                    "project '{}': {}[{}] must be a mapping",
                    project, bucket, index
                )));
            };

            let suffix = match params.remove(SUFFIX_KEY) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s),
                Some(other) => {
                    return Err(invalid(format!(
                        "project '{}': {}[{}]: suffix must be a string, got {}",
                        project, bucket, index, other
                    )))
                }
            };

            Ok(ManifestEntry { params, suffix })
        })
        .collect()
}

fn as_mapping<'v>(value: &'v serde_yaml::Value, project: &str, what: &str) -> Result<Option<&'v Mapping>> {
    match value {
        serde_yaml::Value::Mapping(map) => Ok(Some(map)),
        serde_yaml::Value::Null => Ok(None),
        _ => Err(invalid(format!(
            "project '{}': '{}' must be a mapping",
            project, what
        ))),
    }
}

fn scalar_name(value: &serde_yaml::Value, what: &str) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        _ => Err(invalid(format!("{} must be a scalar", what))),
    }
}

fn invalid(message: impl Into<String>) -> ProvisionError {
    ProvisionError::InvalidManifest {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
projects:
  silicon_valley:
    artifactory:
      repositories:
        local:
          - key: "silicon_valley-local1-repo"
            package_type: "maven"
            handle_snapshots: false
          - key: "silicon_valley-local2-repo"
            package_type: "docker"
        virtual:
          - key: "silicon_valley-virtual1-repo"
            repositories: ["silicon_valley-local1-repo"]
      permissions:
        - name: "silicon_valley-readers"
          repositories: ["silicon_valley-local1-repo"]
          suffix: "-shared"
    jenkins:
      jobs: []
  mr_robot:
    artifactory:
      repositories:
        remote:
          - key: "mr_robot-remote1-repo"
            url: "http://hub.docker.com"
"#;

    #[test]
    fn test_projects_keep_file_order() {
        let manifest = Manifest::from_yaml(SAMPLE).unwrap();
        let names: Vec<&str> = manifest.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["silicon_valley", "mr_robot"]);
    }

    #[test]
    fn test_buckets_and_entries() {
        let manifest = Manifest::from_yaml(SAMPLE).unwrap();
        let sv = &manifest.projects[0];

        assert_eq!(sv.local.len(), 2);
        assert_eq!(sv.local[0].key("key"), Some("silicon_valley-local1-repo"));
        assert_eq!(sv.local[0].params["handle_snapshots"], json!(false));
        assert!(sv.remote.is_empty());
        assert_eq!(sv.r#virtual.len(), 1);
        assert_eq!(manifest.entry_count(&Bucket::ORDER), 5);
        assert_eq!(manifest.entry_count(&Bucket::REPOSITORIES), 4);
    }

    #[test]
    fn test_suffix_override_is_extracted() {
        let manifest = Manifest::from_yaml(SAMPLE).unwrap();
        let permission = &manifest.projects[0].permissions[0];
        assert_eq!(permission.suffix.as_deref(), Some("-shared"));
        assert!(!permission.params.contains_key("suffix"));
    }

    #[test]
    fn test_missing_projects_is_invalid() {
        let err = Manifest::from_yaml("repositories: []").unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidManifest { .. }));
    }

    #[test]
    fn test_unknown_bucket_is_invalid() {
        let yaml = r#"
projects:
  p:
    artifactory:
      repositories:
        federated:
          - key: "x"
"#;
        let err = Manifest::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("federated"));
    }

    #[test]
    fn test_empty_sections_are_allowed() {
        let yaml = r#"
projects:
  p:
    artifactory:
      repositories:
        local:
  q:
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.projects.len(), 2);
        assert_eq!(manifest.entry_count(&Bucket::ORDER), 0);
    }
}
