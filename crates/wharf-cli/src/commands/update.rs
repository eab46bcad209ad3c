//! Update command - refresh derived dependency data
//!
//! Recomputes the legacy constraint stored next to every dependency in
//! `component.yaml` and writes the JSON dependency manifest.

use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

use wharf_core::{ComponentMetadata, Descriptor, MetadataStore};

use crate::display;
use crate::error::Result;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize)]
struct Manifest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    version: String,
    license: String,
    authors: Vec<ManifestAuthor>,
    require: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    suggest: IndexMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ManifestAuthor {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    role: String,
}

/// Vendor part of a channel host: `pear.horde.org` gives `horde`
pub fn channel_vendor(channel: &str) -> &str {
    let labels: Vec<&str> = channel.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => channel,
        1 => labels[0],
        n => labels[n - 2],
    }
}

fn manifest(metadata: &ComponentMetadata) -> Result<Manifest> {
    let mut require = IndexMap::new();
    let mut suggest = IndexMap::new();
    for dependency in metadata.dependencies()? {
        let key = dependency.manifest_key();
        if dependency.required {
            require.insert(key, dependency.constraint.clone());
        } else {
            suggest.insert(key, dependency.constraint.clone());
        }
    }

    Ok(Manifest {
        name: format!("{}/{}", channel_vendor(&metadata.channel), metadata.name).to_lowercase(),
        description: metadata.summary.clone(),
        version: metadata.version.release.clone(),
        license: metadata.license.identifier.clone(),
        authors: metadata
            .authors
            .iter()
            .filter(|a| a.active)
            .map(|a| ManifestAuthor {
                name: a.name.clone(),
                email: a.email.clone(),
                role: a.role.clone(),
            })
            .collect(),
        require,
        suggest,
    })
}

/// Recompute legacy constraints in place; returns how many changed
fn refresh_legacy_constraints(metadata: &mut ComponentMetadata) -> Result<usize> {
    let mut changed = 0;
    for entry in &mut metadata.dependencies {
        let legacy = entry.to_dependency()?.legacy_constraint()?;
        if entry.legacy != legacy {
            entry.legacy = legacy;
            changed += 1;
        }
    }
    Ok(changed)
}

pub fn run(path: &Path, pretend: bool) -> Result<()> {
    let mut descriptor = Descriptor::load(path)?;
    let changed = refresh_legacy_constraints(descriptor.metadata_mut())?;
    let manifest = manifest(descriptor.metadata())?;
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| {
        crate::error::CliError::internal(format!("Failed to render {}: {}", MANIFEST_FILE, e))
    })? + "\n";

    let manifest_path = descriptor.root().join(MANIFEST_FILE);
    if pretend {
        println!(
            "Would update {} legacy constraint(s) in {}",
            changed,
            descriptor.path().display()
        );
        println!("Would write {}:", manifest_path.display());
        print!("{}", json);
        return Ok(());
    }

    descriptor.save()?;
    std::fs::write(&manifest_path, json)?;
    display::success(&format!(
        "Updated {} ({} legacy constraint(s) changed) and wrote {}",
        descriptor.path().display(),
        changed,
        manifest_path.display()
    ));
    Ok(())
}
