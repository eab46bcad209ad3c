//! Release tasks and the context they run in

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use similar::TextDiff;
use wharf_core::changelog::{CHANGELOG_FILE, Changelog};
use wharf_core::{ComponentMetadata, Descriptor, MetadataStore, ProcessRunner};
use wharf_repo::HttpClient;

use crate::error::{ReleaseError, Result};
use crate::mail::Mailer;
use crate::options::{ReleaseOptions, RunState};
use crate::tasks;
use crate::vcs::Vcs;

/// External systems tasks talk to
#[derive(Clone)]
pub struct Collaborators {
    pub vcs: Rc<dyn Vcs>,
    pub runner: Rc<dyn ProcessRunner>,
    pub http: Rc<dyn HttpClient>,
    pub mailer: Rc<dyn Mailer>,
}

/// Everything a task may read or change during one run
pub struct TaskContext<'a> {
    pub descriptor: &'a mut Descriptor,
    pub options: &'a ReleaseOptions,
    pub collaborators: &'a Collaborators,
    pub state: RunState,
}

impl<'a> TaskContext<'a> {
    pub fn new(
        descriptor: &'a mut Descriptor,
        options: &'a ReleaseOptions,
        collaborators: &'a Collaborators,
    ) -> Self {
        Self {
            descriptor,
            options,
            collaborators,
            state: RunState::default(),
        }
    }

    pub fn metadata(&self) -> &ComponentMetadata {
        self.descriptor.metadata()
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn version(&self) -> &str {
        &self.metadata().version.release
    }

    /// Component directory
    pub fn root(&self) -> PathBuf {
        self.descriptor.root().to_path_buf()
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.descriptor.root().join(CHANGELOG_FILE)
    }

    pub fn load_changelog(&self) -> Result<Changelog> {
        Ok(Changelog::load(&self.changelog_path())?)
    }

    pub fn pretend(&self) -> bool {
        self.options.pretend
    }

    /// Record an output line
    pub fn say(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.state.messages.push(message);
    }

    /// Report the change a write to `path` would make
    pub fn show_diff(&mut self, path: &Path, new: &str) {
        let old = std::fs::read_to_string(path).unwrap_or_default();
        let label = path
            .strip_prefix(self.descriptor.root())
            .unwrap_or(path)
            .display()
            .to_string();
        if old == new {
            self.say(format!("No changes to {}", label));
            return;
        }
        let diff = TextDiff::from_lines(old.as_str(), new);
        let rendered = diff
            .unified_diff()
            .context_radius(1)
            .header(&format!("a/{}", label), &format!("b/{}", label))
            .to_string();
        self.say(rendered.trim_end().to_string());
    }

    /// Write `content` to `path` and stage it, or show the diff in pretend mode
    pub fn write_staged(&mut self, path: &Path, content: &str) -> Result<()> {
        if self.pretend() {
            self.show_diff(path, content);
        } else {
            std::fs::write(path, content)?;
        }
        self.state.commit.stage(path);
        Ok(())
    }

    /// Save the descriptor, or show the diff in pretend mode
    pub fn save_descriptor(&mut self) -> Result<()> {
        let path = self.descriptor.path().to_path_buf();
        if self.pretend() {
            let rendered = self.descriptor.render()?;
            self.show_diff(&path, &rendered);
        } else {
            self.descriptor.save()?;
        }
        self.state.commit.stage(path);
        Ok(())
    }

    /// Commit everything staged so far
    pub fn flush_commit(&mut self, message: &str) -> Result<()> {
        if self.state.commit.is_empty() {
            return Ok(());
        }
        let root = self.root();
        if self.pretend() {
            let staged = self.state.commit.describe(&root);
            self.state.commit.take();
            self.say(format!("Would commit {} with message \"{}\"", staged, message));
            return Ok(());
        }
        let paths = self.state.commit.take();
        self.collaborators.vcs.stage(&root, &paths)?;
        self.collaborators.vcs.commit(&root, message)?;
        self.say(format!("Committed: {}", message));
        Ok(())
    }
}

/// One named release step
///
/// Tasks keep no state between runs; everything they share lives in the
/// [`TaskContext`].
pub trait Task {
    fn name(&self) -> &'static str;

    /// Problems that prevent the task from running
    fn pre_validate(&self, _context: &TaskContext) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, context: &mut TaskContext) -> Result<()>;

    /// Problems detected after the run
    fn post_validate(&self, _context: &TaskContext) -> Vec<String> {
        Vec::new()
    }

    /// Whether failing validation drops the task instead of aborting the run
    fn skippable(&self, options: &ReleaseOptions) -> bool {
        options.skip_invalid
    }
}

/// Name to task lookup
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<&'static str, Box<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in task
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(tasks::BranchTask));
        registry.register(Box::new(tasks::TestTask));
        registry.register(Box::new(tasks::TimestampTask));
        registry.register(Box::new(tasks::ChangelogTask));
        registry.register(Box::new(tasks::CommitTask));
        registry.register(Box::new(tasks::PackageTask));
        registry.register(Box::new(tasks::TagTask));
        registry.register(Box::new(tasks::TrackerTask));
        registry.register(Box::new(tasks::AnnounceTask));
        registry.register(Box::new(tasks::PublishTask));
        registry.register(Box::new(tasks::NextVersionTask));
        registry.register(Box::new(tasks::PushTask));
        registry
    }

    pub fn register(&mut self, task: Box<dyn Task>) {
        self.tasks.insert(task.name(), task);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Result<&dyn Task> {
        self.tasks
            .get(name)
            .map(|task| task.as_ref())
            .ok_or_else(|| ReleaseError::UnknownTask {
                name: name.to_string(),
                suggestion: self.closest(name),
            })
    }

    fn closest(&self, name: &str) -> Option<String> {
        self.tasks
            .keys()
            .map(|candidate| (strsim::levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let registry = TaskRegistry::with_defaults();
        assert_eq!(registry.names().len(), 12);
        assert_eq!(registry.get("package").unwrap().name(), "package");
    }

    #[test]
    fn test_unknown_task_suggests_nearest() {
        let registry = TaskRegistry::with_defaults();
        match registry.get("pakage") {
            Err(ReleaseError::UnknownTask { name, suggestion }) => {
                assert_eq!(name, "pakage");
                assert_eq!(suggestion.as_deref(), Some("package"));
            }
            _ => panic!("expected unknown task"),
        }
        match registry.get("deploy-to-production") {
            Err(ReleaseError::UnknownTask { suggestion, .. }) => assert!(suggestion.is_none()),
            _ => panic!("expected unknown task"),
        }
    }
}
