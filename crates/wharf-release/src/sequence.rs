//! Named task sequences

use std::collections::BTreeMap;

use crate::error::{ReleaseError, Result};

/// Order tasks run in, whatever order they were requested in
pub const CANONICAL_ORDER: [&str; 12] = [
    "branch",
    "test",
    "timestamp",
    "changelog",
    "package",
    "commit",
    "tag",
    "tracker",
    "announce",
    "publish",
    "nextversion",
    "push",
];

/// Steps a task cannot run without
const IMPLIED: [(&str, &str); 3] = [
    ("publish", "package"),
    ("announce", "package"),
    ("tag", "commit"),
];

fn position(name: &str) -> usize {
    CANONICAL_ORDER
        .iter()
        .position(|candidate| *candidate == name)
        .unwrap_or(CANONICAL_ORDER.len())
}

/// Add implied steps, drop duplicates and sort by [`CANONICAL_ORDER`]
///
/// Names outside the canonical order keep their relative order at the end
/// so the registry can report them as unknown.
pub fn expand<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut steps: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !steps.iter().any(|s| s == name) {
            steps.push(name.to_string());
        }
    };
    for name in names {
        let name = name.as_ref();
        push(name);
        for (step, implied) in IMPLIED {
            if step == name {
                push(implied);
            }
        }
    }
    steps.sort_by_key(|name| position(name));
    steps
}

/// Sequence name to task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequences {
    sequences: BTreeMap<String, Vec<String>>,
}

impl Default for Sequences {
    fn default() -> Self {
        let mut sequences = BTreeMap::new();
        sequences.insert(
            "release:default".to_string(),
            ["timestamp", "changelog", "package", "commit", "tag", "nextversion"]
                .map(String::from)
                .to_vec(),
        );
        sequences.insert(
            "release:full".to_string(),
            CANONICAL_ORDER.map(String::from).to_vec(),
        );
        Self { sequences }
    }
}

impl Sequences {
    /// Built-in sequences overlaid with the configured ones
    pub fn from_config(configured: &BTreeMap<String, Vec<String>>) -> Self {
        let mut sequences = Self::default();
        for (name, steps) in configured {
            sequences.sequences.insert(name.clone(), steps.clone());
        }
        sequences
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&[String]> {
        self.sequences
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ReleaseError::UnknownSequence {
                name: name.to_string(),
            })
    }

    /// Expanded task list of the sequence `name`
    pub fn expand(&self, name: &str) -> Result<Vec<String>> {
        Ok(expand(self.get(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_adds_implied_steps_in_canonical_order() {
        assert_eq!(expand(&["publish", "tag"]), ["package", "commit", "tag", "publish"]);
        assert_eq!(expand(&["announce"]), ["package", "announce"]);
    }

    #[test]
    fn test_expand_dedups_and_keeps_unknown_last() {
        assert_eq!(
            expand(&["deploy", "push", "test", "push", "audit"]),
            ["test", "push", "deploy", "audit"]
        );
    }

    #[test]
    fn test_default_sequences() {
        let sequences = Sequences::default();
        assert_eq!(
            sequences.expand("release:default").unwrap(),
            ["timestamp", "changelog", "package", "commit", "tag", "nextversion"]
        );
        assert_eq!(sequences.expand("release:full").unwrap().len(), 12);
    }

    #[test]
    fn test_configured_sequences_override() {
        let mut configured = BTreeMap::new();
        configured.insert("release:default".to_string(), vec!["tag".to_string()]);
        configured.insert("docs".to_string(), vec!["changelog".to_string()]);
        let sequences = Sequences::from_config(&configured);

        assert_eq!(sequences.expand("release:default").unwrap(), ["commit", "tag"]);
        assert_eq!(sequences.get("docs").unwrap(), ["changelog"]);
        assert_eq!(sequences.names().count(), 3);
        assert!(matches!(
            sequences.get("nightly"),
            Err(ReleaseError::UnknownSequence { .. })
        ));
    }
}
