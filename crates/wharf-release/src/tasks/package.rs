use wharf_core::archive::{archive_name, create_archive};
use wharf_core::process::split_command;

use crate::error::{ReleaseError, Result};
use crate::task::{Task, TaskContext};

/// Runs the component's test suite
pub struct TestTask;

impl Task for TestTask {
    fn name(&self) -> &'static str {
        "test"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        let Some(command) = &context.options.test_command else {
            return vec!["No test command configured".to_string()];
        };
        match split_command(command) {
            Ok(words) if words.is_empty() => vec!["No test command configured".to_string()],
            Ok(_) => Vec::new(),
            Err(err) => vec![err.to_string()],
        }
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let command = context.options.test_command.clone().unwrap_or_default();
        if context.pretend() {
            context.say(format!("Would run tests: {}", command));
            return Ok(());
        }

        let output = context
            .collaborators
            .runner
            .run(&split_command(&command)?, &context.root())?;
        if !output.success() {
            return Err(ReleaseError::TaskFailed {
                task: self.name().to_string(),
                message: format!(
                    "`{}` exited with code {}\n{}",
                    command,
                    output.code,
                    output.combined().trim_end()
                ),
            });
        }
        context.say("Tests passed");
        Ok(())
    }
}

/// Builds the release archive
pub struct PackageTask;

impl Task for PackageTask {
    fn name(&self) -> &'static str {
        "package"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        context.metadata().validate()
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let dir = context
            .options
            .archive_dir
            .clone()
            .unwrap_or_else(|| context.root());
        let output = dir.join(archive_name(context.name(), context.version()));
        context.state.package = Some(output.clone());

        if context.pretend() {
            context.say(format!("Would package {}", output.display()));
            return Ok(());
        }

        std::fs::create_dir_all(&dir)?;
        create_archive(&context.root(), context.metadata(), &output)?;
        context.say(format!("Packaged {}", output.display()));
        Ok(())
    }

    fn post_validate(&self, context: &TaskContext) -> Vec<String> {
        match &context.state.package {
            Some(path) if !context.pretend() && !path.exists() => {
                vec![format!("Archive {} is missing", path.display())]
            }
            _ => Vec::new(),
        }
    }
}
