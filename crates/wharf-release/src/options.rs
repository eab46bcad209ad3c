//! Per-run settings and the mutable state shared by tasks

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use wharf_core::Stability;

/// Read-only settings of one release run
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Report what would happen without touching anything
    pub pretend: bool,
    /// Drop tasks whose validation fails instead of aborting
    pub skip_invalid: bool,
    /// Date written by the `timestamp` task
    pub release_date: NaiveDate,

    pub next_version: Option<String>,
    pub next_api: Option<String>,
    pub next_stability: Option<Stability>,
    pub next_api_stability: Option<Stability>,
    pub next_note: Option<String>,

    /// Branch releases must be made from
    pub branch: Option<String>,
    /// Git remote pushed to
    pub remote: String,
    /// Where `package` writes archives, defaults to the component directory
    pub archive_dir: Option<PathBuf>,
    pub test_command: Option<String>,

    pub announce_from: Option<String>,
    pub announce_to: Vec<String>,
    pub tracker_url: Option<String>,
    pub upload_url: Option<String>,
}

impl ReleaseOptions {
    pub fn new(release_date: NaiveDate) -> Self {
        Self {
            pretend: false,
            skip_invalid: false,
            release_date,
            next_version: None,
            next_api: None,
            next_stability: None,
            next_api_stability: None,
            next_note: None,
            branch: None,
            remote: "origin".to_string(),
            archive_dir: None,
            test_command: None,
            announce_from: None,
            announce_to: Vec::new(),
            tracker_url: None,
            upload_url: None,
        }
    }
}

/// Paths staged across tasks and committed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitBatch {
    paths: Vec<PathBuf>,
}

impl CommitBatch {
    pub fn stage(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Empty the batch, returning what was staged
    pub fn take(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }

    /// Staged paths relative to `root`, for display
    pub fn describe(&self, root: &Path) -> String {
        self.paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap_or(p).display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Mutable state of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Release version before `nextversion` replaced it
    pub previous_version: Option<String>,
    pub next_version: Option<String>,
    pub commit: CommitBatch,
    /// Archive produced by `package`
    pub package: Option<PathBuf>,
    pub messages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_batch_dedups_and_drains() {
        let mut batch = CommitBatch::default();
        batch.stage("/c/component.yaml");
        batch.stage("/c/changelog.yml");
        batch.stage("/c/component.yaml");
        assert_eq!(batch.paths().len(), 2);
        assert_eq!(
            batch.describe(Path::new("/c")),
            "component.yaml, changelog.yml"
        );
        assert_eq!(batch.take().len(), 2);
        assert!(batch.is_empty());
    }
}
