use crate::error::Result;
use crate::options::ReleaseOptions;
use crate::task::{Task, TaskContext};

/// Refuses to release from the wrong branch
pub struct BranchTask;

impl Task for BranchTask {
    fn name(&self) -> &'static str {
        "branch"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        let Some(required) = &context.options.branch else {
            return Vec::new();
        };
        match context.collaborators.vcs.current_branch(&context.root()) {
            Ok(current) if &current == required => Vec::new(),
            Ok(current) => vec![format!(
                "Current branch '{}' is not the release branch '{}'",
                current, required
            )],
            Err(e) => vec![format!("Unable to determine the current branch: {}", e)],
        }
    }

    fn run(&self, _context: &mut TaskContext) -> Result<()> {
        Ok(())
    }

    fn skippable(&self, _options: &ReleaseOptions) -> bool {
        false
    }
}

/// Commits the files staged by earlier tasks
pub struct CommitTask;

impl Task for CommitTask {
    fn name(&self) -> &'static str {
        "commit"
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        if context.state.commit.is_empty() {
            context.say("Nothing to commit");
            return Ok(());
        }
        let message = format!("Released {} {}", context.name(), context.version());
        context.flush_commit(&message)
    }
}

/// Tags the release commit as `<name>-v<version>`
pub struct TagTask;

impl TagTask {
    pub fn tag_name(name: &str, version: &str) -> String {
        format!("{}-v{}", name, version)
    }
}

impl Task for TagTask {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let tag = Self::tag_name(context.name(), context.version());
        let message = format!("Released {} {}", context.name(), context.version());
        if context.pretend() {
            context.say(format!("Would tag {} with message \"{}\"", tag, message));
            return Ok(());
        }
        context
            .collaborators
            .vcs
            .tag(&context.root(), &tag, &message)?;
        context.say(format!("Tagged {}", tag));
        Ok(())
    }
}

/// Pushes the release branch and tags
pub struct PushTask;

impl Task for PushTask {
    fn name(&self) -> &'static str {
        "push"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        if context.options.remote.trim().is_empty() {
            vec!["No remote configured to push the release to".to_string()]
        } else {
            Vec::new()
        }
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let root = context.root();
        let branch = match &context.options.branch {
            Some(branch) => branch.clone(),
            None => context.collaborators.vcs.current_branch(&root)?,
        };
        let remote = context.options.remote.clone();
        if context.pretend() {
            context.say(format!("Would push {} and tags to {}", branch, remote));
            return Ok(());
        }
        context.collaborators.vcs.push(&root, &remote, &branch)?;
        context.say(format!("Pushed {} and tags to {}", branch, remote));
        Ok(())
    }

    fn skippable(&self, _options: &ReleaseOptions) -> bool {
        false
    }
}
