//! Wharf configuration
//!
//! Looked up in order: an explicit `--config` path, `./.wharf.yaml`, then
//! `~/.config/wharf/config.yaml`. A missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wharf_core::InstructionRules;

use crate::error::{RepoError, Result};

pub const LOCAL_CONFIG_FILE: &str = ".wharf.yaml";

/// Configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WharfConfig {
    /// Registry channel whose components live in `checkout_root`
    pub home_channel: String,

    /// Directory holding one source checkout per component
    pub checkout_root: Option<PathBuf>,

    /// Directory searched for local component archives
    pub sourcepath: Option<PathBuf>,

    /// Command prefix used to install a component
    pub install_command: String,

    /// Command running a component's test suite
    pub test_command: Option<String>,

    /// Branch releases must be made from
    pub branch: Option<String>,

    /// Git remote releases are pushed to
    pub remote: String,

    /// Configured registry channels
    pub channels: Vec<Channel>,

    /// Named release sequences (`release:default` and friends)
    pub sequences: BTreeMap<String, Vec<String>>,

    /// Default instruction rules
    pub instructions: InstructionRules,

    /// Announcement addresses
    pub announce: Announce,

    #[serde(with = "humantime_serde")]
    pub process_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,
}

impl Default for WharfConfig {
    fn default() -> Self {
        Self {
            home_channel: "pear.horde.org".to_string(),
            checkout_root: None,
            sourcepath: None,
            install_command: "pear install".to_string(),
            test_command: None,
            branch: None,
            remote: "origin".to_string(),
            channels: Vec::new(),
            sequences: BTreeMap::new(),
            instructions: InstructionRules::default(),
            announce: Announce::default(),
            process_timeout: Duration::from_secs(300),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl WharfConfig {
    /// Load from `explicit` or the first existing default location
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(RepoError::InvalidConfig {
                    message: format!("Configuration file not found: {}", path.display()),
                });
            }
            return Self::load_from(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| RepoError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// `~/.config/wharf/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wharf").join("config.yaml"))
    }

    fn validate(&self) -> Result<()> {
        for channel in &self.channels {
            channel.validate()?;
        }
        Ok(())
    }

    /// Get a channel by name
    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RepoError::ChannelNotFound {
                name: name.to_string(),
            })
    }
}

/// A registry channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name, e.g. `pear.horde.org`
    pub name: String,

    /// Base URL of the release REST interface
    pub url: String,

    /// Endpoint accepting package uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,

    /// Endpoint registering new versions with the issue tracker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_url: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            upload_url: None,
            tracker_url: None,
        }
    }

    fn validate(&self) -> Result<()> {
        for url in std::iter::once(&self.url)
            .chain(self.upload_url.iter())
            .chain(self.tracker_url.iter())
        {
            let parsed = url::Url::parse(url).map_err(|e| RepoError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RepoError::InvalidUrl {
                    url: url.clone(),
                    reason: "URL must start with http:// or https://".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Release announcement addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announce {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
}
