//! Resource variants and kinds
//!
//! A [`ResourceKind`] is a collection on the registry (one REST path each).
//! A [`ResourceVariant`] is a concrete shape inside a kind; repositories come
//! in three classes, every other kind has exactly one variant.

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry collection a resource lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Repository,
    User,
    Group,
    Permission,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Repository,
        ResourceKind::User,
        ResourceKind::Group,
        ResourceKind::Permission,
    ];

    /// Capitalised label used in outcome messages ("Repository foo created")
    pub fn label(self) -> &'static str {
        match self {
            Self::Repository => "Repository",
            Self::User => "User",
            Self::Group => "Group",
            Self::Permission => "Permission",
        }
    }

    /// Variants belonging to this kind, in canonical order
    pub fn variants(self) -> &'static [ResourceVariant] {
        match self {
            Self::Repository => &[
                ResourceVariant::Local,
                ResourceVariant::Remote,
                ResourceVariant::Virtual,
            ],
            Self::User => &[ResourceVariant::User],
            Self::Group => &[ResourceVariant::Group],
            Self::Permission => &[ResourceVariant::Permission],
        }
    }

    /// The only variant of a single-variant kind
    pub fn sole_variant(self) -> Option<ResourceVariant> {
        match self.variants() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Concrete resource shape with its own field schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceVariant {
    Local,
    Remote,
    Virtual,
    User,
    Group,
    Permission,
}

impl ResourceVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Virtual => "virtual",
            Self::User => "user",
            Self::Group => "group",
            Self::Permission => "permission",
        }
    }

    pub fn kind(self) -> ResourceKind {
        match self {
            Self::Local | Self::Remote | Self::Virtual => ResourceKind::Repository,
            Self::User => ResourceKind::User,
            Self::Group => ResourceKind::Group,
            Self::Permission => ResourceKind::Permission,
        }
    }

    /// Repository class sent as `rclass`; `None` for non-repository variants
    pub fn rclass(self) -> Option<&'static str> {
        match self.kind() {
            ResourceKind::Repository => Some(self.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceVariant {
    type Err = ProvisionError;

    /// Case-insensitive; anything else is an [`ProvisionError::UnknownVariant`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "virtual" => Ok(Self::Virtual),
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "permission" => Ok(Self::Permission),
            _ => Err(ProvisionError::UnknownVariant {
                tag: s.to_string(),
            }),
        }
    }
}
