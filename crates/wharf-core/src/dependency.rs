//! Dependency descriptors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::version::{LegacyConstraint, composer_style_to_legacy_constraint};

/// What a dependency points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// The language runtime itself
    Runtime,
    /// An extension of the language runtime
    Extension,
    /// A component published on a registry channel
    Package,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Runtime => "runtime",
            DependencyKind::Extension => "extension",
            DependencyKind::Package => "package",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "runtime" | "php" => Ok(DependencyKind::Runtime),
            "extension" | "ext" => Ok(DependencyKind::Extension),
            "package" | "pkg" => Ok(DependencyKind::Package),
            other => Err(other.to_string()),
        }
    }
}

/// A dependency of a component
///
/// Dependencies are immutable once read from a descriptor. The pair
/// `channel/name` identifies the dependency during graph traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Registry channel, empty for runtime and extension dependencies
    pub channel: String,
    pub required: bool,
    pub kind: DependencyKind,
    /// Composer-style constraint expression (`*`, `^1.2`, `^1 || ^2`)
    pub constraint: String,
}

impl Dependency {
    /// Create a required package dependency
    pub fn package(channel: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            required: true,
            kind: DependencyKind::Package,
            constraint: "*".to_string(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    /// Graph key: `channel/name`
    pub fn key(&self) -> String {
        component_key(&self.channel, &self.name)
    }

    pub fn is_package(&self) -> bool {
        self.kind == DependencyKind::Package
    }

    pub fn is_runtime(&self) -> bool {
        self.kind == DependencyKind::Runtime
    }

    /// Legacy form of the constraint
    pub fn legacy_constraint(&self) -> Result<LegacyConstraint> {
        composer_style_to_legacy_constraint(&self.constraint)
    }

    /// Key under which the dependency appears in a JSON dependency manifest
    pub fn manifest_key(&self) -> String {
        match self.kind {
            DependencyKind::Runtime => "php".to_string(),
            DependencyKind::Extension => format!("ext-{}", self.name.to_lowercase()),
            DependencyKind::Package => format!("{}/{}", self.channel, self.name),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.channel.is_empty() {
            write!(f, "{} {}", self.name, self.constraint)
        } else {
            write!(f, "{}/{} {}", self.channel, self.name, self.constraint)
        }
    }
}

/// Graph key shared by dependencies and components
pub fn component_key(channel: &str, name: &str) -> String {
    format!("{}/{}", channel, name)
}

/// Dependency entry as stored in a component descriptor
///
/// The type tag stays a raw string until the entry is turned into a
/// [`Dependency`], so an unknown tag survives a read/write cycle and is
/// reported when the dependency is re-emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default = "default_constraint")]
    pub constraint: String,
    /// Legacy constraint computed by `update`
    #[serde(default, skip_serializing_if = "LegacyConstraint::is_unconstrained")]
    pub legacy: LegacyConstraint,
}

fn default_true() -> bool {
    true
}

fn default_constraint() -> String {
    "*".to_string()
}

impl DependencyEntry {
    /// Convert into a typed dependency
    pub fn to_dependency(&self) -> Result<Dependency> {
        let kind = self
            .kind
            .parse::<DependencyKind>()
            .map_err(|kind| CoreError::UnknownDependencyType {
                name: self.name.clone(),
                kind,
            })?;

        Ok(Dependency {
            name: self.name.clone(),
            channel: self.channel.clone(),
            required: self.required,
            kind,
            constraint: self.constraint.clone(),
        })
    }
}

impl From<&Dependency> for DependencyEntry {
    fn from(dep: &Dependency) -> Self {
        Self {
            name: dep.name.clone(),
            channel: dep.channel.clone(),
            kind: dep.kind.as_str().to_string(),
            required: dep.required,
            constraint: dep.constraint.clone(),
            legacy: LegacyConstraint::default(),
        }
    }
}
