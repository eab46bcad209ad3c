//! Component metadata and the descriptor file that stores it

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dependency::{Dependency, DependencyEntry};
use crate::error::{CoreError, Result};
use crate::version::{self, Stability};

/// File name of the component descriptor inside a checkout or archive
pub const DESCRIPTOR_FILE: &str = "component.yaml";

/// Metadata of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// Component name (required)
    pub name: String,

    /// Registry channel the component is published on (required)
    pub channel: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Release and API version
    pub version: Versions,

    /// Release and API stability
    pub stability: Stabilities,

    /// Release date, set when the release is timestamped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Notes of the current release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(default)]
    pub license: License,

    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub release: String,
    pub api: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stabilities {
    pub release: Stability,
    pub api: Stability,
}

/// Author or maintainer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_role() -> String {
    "lead".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl ComponentMetadata {
    /// Parse metadata from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let metadata: Self = serde_yaml::from_str(content)?;
        if metadata.name.trim().is_empty() {
            return Err(CoreError::InvalidDescriptor {
                message: "name must not be empty".to_string(),
            });
        }
        if metadata.channel.trim().is_empty() {
            return Err(CoreError::InvalidDescriptor {
                message: format!("channel of {} must not be empty", metadata.name),
            });
        }
        Ok(metadata)
    }

    /// Render as YAML text
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Typed dependencies, failing on unknown type tags
    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        self.dependencies
            .iter()
            .map(DependencyEntry::to_dependency)
            .collect()
    }

    /// Check versions and stabilities for consistency
    ///
    /// Returns human readable issues; an empty list means the metadata is
    /// releasable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Err(e) = version::validate(&self.version.release) {
            issues.push(format!("Release {}", e));
        } else if let Err(e) =
            version::validate_release_stability(&self.version.release, self.stability.release)
        {
            issues.push(e.to_string());
        }

        if let Err(e) = version::validate(&self.version.api) {
            issues.push(format!("API {}", e));
        } else if let Err(e) =
            version::validate_api_stability(&self.version.api, self.stability.api)
        {
            issues.push(e.to_string());
        }

        if self.license.identifier.is_empty() {
            issues.push(format!("{} declares no license", self.name));
        }

        issues
    }

    /// Read a single field
    pub fn get(&self, field: Field) -> Option<String> {
        match field {
            Field::Name => Some(self.name.clone()),
            Field::Channel => Some(self.channel.clone()),
            Field::Summary => self.summary.clone(),
            Field::Description => self.description.clone(),
            Field::ReleaseVersion => Some(self.version.release.clone()),
            Field::ApiVersion => Some(self.version.api.clone()),
            Field::ReleaseStability => Some(self.stability.release.to_string()),
            Field::ApiStability => Some(self.stability.api.to_string()),
            Field::Date => self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            Field::Notes => self.notes.clone(),
            Field::License => Some(self.license.identifier.clone()),
            Field::LicenseUri => self.license.uri.clone(),
        }
    }

    /// Write a single field
    ///
    /// Stabilities and dates are parsed; versions are stored as given so a
    /// development marker such as `-git` can be written.
    pub fn set(&mut self, field: Field, value: &str) -> Result<()> {
        match field {
            Field::Name => self.name = value.to_string(),
            Field::Channel => self.channel = value.to_string(),
            Field::Summary => self.summary = Some(value.to_string()),
            Field::Description => self.description = Some(value.to_string()),
            Field::ReleaseVersion => self.version.release = value.to_string(),
            Field::ApiVersion => self.version.api = value.to_string(),
            Field::ReleaseStability => self.stability.release = value.parse()?,
            Field::ApiStability => self.stability.api = value.parse()?,
            Field::Date => {
                let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
                    CoreError::InvalidDescriptor {
                        message: format!("invalid date '{}': {}", value, e),
                    }
                })?;
                self.date = Some(date);
            }
            Field::Notes => self.notes = Some(value.to_string()),
            Field::License => self.license.identifier = value.to_string(),
            Field::LicenseUri => self.license.uri = Some(value.to_string()),
        }
        Ok(())
    }
}

/// Addressable metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Channel,
    Summary,
    Description,
    ReleaseVersion,
    ApiVersion,
    ReleaseStability,
    ApiStability,
    Date,
    Notes,
    License,
    LicenseUri,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Channel => "channel",
            Field::Summary => "summary",
            Field::Description => "description",
            Field::ReleaseVersion => "release version",
            Field::ApiVersion => "api version",
            Field::ReleaseStability => "release stability",
            Field::ApiStability => "api stability",
            Field::Date => "date",
            Field::Notes => "notes",
            Field::License => "license",
            Field::LicenseUri => "license uri",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        let field = match normalized.as_str() {
            "name" => Field::Name,
            "channel" => Field::Channel,
            "summary" => Field::Summary,
            "description" => Field::Description,
            "release version" | "version" => Field::ReleaseVersion,
            "api version" => Field::ApiVersion,
            "release stability" | "state" => Field::ReleaseStability,
            "api stability" => Field::ApiStability,
            "date" => Field::Date,
            "notes" => Field::Notes,
            "license" => Field::License,
            "license uri" => Field::LicenseUri,
            _ => {
                return Err(CoreError::UnknownField {
                    field: s.to_string(),
                });
            }
        };
        Ok(field)
    }
}

/// Narrow read/write access to component metadata
pub trait MetadataStore {
    /// The metadata as currently held in memory
    fn metadata(&self) -> &ComponentMetadata;

    fn get(&self, field: Field) -> Option<String> {
        self.metadata().get(field)
    }

    fn set(&mut self, field: Field, value: &str) -> Result<()>;

    /// Persist the in-memory state
    fn save(&self) -> Result<()>;
}

/// A `component.yaml` file on disk
#[derive(Debug, Clone)]
pub struct Descriptor {
    path: PathBuf,
    metadata: ComponentMetadata,
}

impl Descriptor {
    /// Load the descriptor of the checkout at `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_file(&dir.join(DESCRIPTOR_FILE))
    }

    /// Load a descriptor from an explicit file path
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::DescriptorNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let metadata = ComponentMetadata::from_yaml(&content)?;
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the descriptor
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn metadata_mut(&mut self) -> &mut ComponentMetadata {
        &mut self.metadata
    }

    /// Render the in-memory state as it would be saved
    pub fn render(&self) -> Result<String> {
        self.metadata.to_yaml()
    }
}

impl MetadataStore for Descriptor {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    fn set(&mut self, field: Field, value: &str) -> Result<()> {
        self.metadata.set(field, value)
    }

    fn save(&self) -> Result<()> {
        std::fs::write(&self.path, self.render()?)?;
        tracing::debug!(path = %self.path.display(), "saved descriptor");
        Ok(())
    }
}
