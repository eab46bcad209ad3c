//! Fixtures shared by the unit tests of this crate

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use wharf_core::archive::{archive_name, create_archive};
use wharf_core::dependency::DependencyEntry;
use wharf_core::metadata::{License, Stabilities, Versions};
use wharf_core::{ComponentMetadata, Dependency, Stability};

use crate::error::{RepoError, Result};
use crate::remote::RemoteChannel;

pub const CHANNEL: &str = "pear.example.org";

/// Metadata of a stable component on [`CHANNEL`]; `deps` are `(name, required)`
pub fn metadata(name: &str, version: &str, deps: &[(&str, bool)]) -> ComponentMetadata {
    ComponentMetadata {
        name: name.to_string(),
        channel: CHANNEL.to_string(),
        summary: None,
        description: None,
        version: Versions {
            release: version.to_string(),
            api: version.to_string(),
        },
        stability: Stabilities {
            release: Stability::Stable,
            api: Stability::Stable,
        },
        date: None,
        notes: None,
        authors: Vec::new(),
        license: License {
            identifier: "BSD-2-Clause".to_string(),
            uri: None,
        },
        dependencies: deps
            .iter()
            .map(|(dep, required)| {
                let mut dependency = Dependency::package(CHANNEL, *dep);
                dependency.required = *required;
                DependencyEntry::from(&dependency)
            })
            .collect(),
    }
}

/// Write a checkout `<root>/<name>/component.yaml`
pub fn write_component(root: &Path, name: &str, version: &str, deps: &[(&str, bool)]) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let yaml = metadata(name, version, deps).to_yaml().unwrap();
    std::fs::write(dir.join(wharf_core::metadata::DESCRIPTOR_FILE), yaml).unwrap();
    dir
}

/// In-memory channel
pub struct FakeChannel {
    name: String,
    releases: RefCell<HashMap<(String, Stability), String>>,
    metadata: RefCell<HashMap<(String, String), ComponentMetadata>>,
    queries: Cell<usize>,
}

impl FakeChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            releases: RefCell::new(HashMap::new()),
            metadata: RefCell::new(HashMap::new()),
            queries: Cell::new(0),
        }
    }

    pub fn publish(&self, component: &str, stability: Stability, version: &str, deps: &[(&str, bool)]) {
        self.releases
            .borrow_mut()
            .insert((component.to_string(), stability), version.to_string());
        self.metadata.borrow_mut().insert(
            (component.to_string(), version.to_string()),
            metadata(component, version, deps),
        );
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl RemoteChannel for FakeChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn latest_release(&self, component: &str, stability: Stability) -> Result<Option<String>> {
        self.queries.set(self.queries.get() + 1);
        Ok(self
            .releases
            .borrow()
            .get(&(component.to_string(), stability))
            .cloned())
    }

    fn fetch_metadata(&self, component: &str, version: &str) -> Result<ComponentMetadata> {
        self.metadata
            .borrow()
            .get(&(component.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| RepoError::ResolutionFailed {
                message: format!("unknown {} {}", component, version),
            })
    }

    fn download(&self, component: &str, version: &str, dest: &Path) -> Result<PathBuf> {
        let metadata = self.fetch_metadata(component, version)?;
        let scratch = tempfile::TempDir::new()?;
        std::fs::create_dir_all(dest)?;
        let output = dest.join(archive_name(component, version));
        create_archive(scratch.path(), &metadata, &output)?;
        Ok(output)
    }
}
