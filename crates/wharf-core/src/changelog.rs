//! Release history of a component
//!
//! The history lives in `changelog.yml` as a map from release version to
//! entry, newest first. The plain-text `CHANGES` file is rendered from it.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::metadata::{ComponentMetadata, License, Stabilities};

pub const CHANGELOG_FILE: &str = "changelog.yml";
pub const CHANGES_FILE: &str = "CHANGES";

/// One released (or upcoming) version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub api: String,
    pub state: Stabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub license: License,
    #[serde(default)]
    pub notes: String,
}

impl ChangelogEntry {
    /// Entry describing the current state of `metadata`
    pub fn from_metadata(metadata: &ComponentMetadata, notes: impl Into<String>) -> Self {
        Self {
            api: metadata.version.api.clone(),
            state: metadata.stability,
            date: metadata.date,
            license: metadata.license.clone(),
            notes: notes.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changelog {
    entries: IndexMap<String, ChangelogEntry>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `changelog.yml`, returning an empty history when absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn render(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, version: &str) -> Option<&ChangelogEntry> {
        self.entries.get(version)
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<(&String, &ChangelogEntry)> {
        self.entries.first()
    }

    /// Add an entry on top of the history
    ///
    /// An existing entry for the same version is replaced and moved to the
    /// top.
    pub fn add_entry(&mut self, version: impl Into<String>, entry: ChangelogEntry) {
        let version = version.into();
        self.entries.shift_remove(&version);
        self.entries.shift_insert(0, version, entry);
    }

    /// Set the release date of `version`; returns whether the entry exists
    pub fn timestamp(&mut self, version: &str, date: NaiveDate) -> bool {
        match self.entries.get_mut(version) {
            Some(entry) => {
                entry.date = Some(date);
                true
            }
            None => false,
        }
    }

    /// Append a note line to `version`; returns whether the entry exists
    pub fn add_note(&mut self, version: &str, note: &str) -> bool {
        match self.entries.get_mut(version) {
            Some(entry) => {
                if !entry.notes.is_empty() && !entry.notes.ends_with('\n') {
                    entry.notes.push('\n');
                }
                entry.notes.push_str(note);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChangelogEntry)> {
        self.entries.iter()
    }

    /// Render the plain-text `CHANGES` file
    pub fn render_changes(&self) -> String {
        let mut out = String::new();
        for (version, entry) in &self.entries {
            let title = format!("v{}", version);
            let rule = "-".repeat(title.len());
            out.push_str(&rule);
            out.push('\n');
            out.push_str(&title);
            out.push('\n');
            out.push_str(&rule);
            out.push_str("\n\n");
            let notes = entry.notes.trim_end();
            if !notes.is_empty() {
                out.push_str(notes);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}
