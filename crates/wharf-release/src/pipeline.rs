//! Runs a task sequence against one component
//!
//! Every task is validated before the first one runs. Validation issues of
//! tasks that may be skipped turn into warnings; any other issue aborts the
//! run before anything was touched.

use wharf_core::Descriptor;

use crate::error::{ReleaseError, Result};
use crate::options::ReleaseOptions;
use crate::task::{Collaborators, Task, TaskContext, TaskRegistry};

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Tasks that ran, in order
    pub executed: Vec<String>,
    /// Tasks dropped because their validation failed
    pub warnings: Vec<String>,
    /// Problems found after the run
    pub post_issues: Vec<String>,
    pub messages: Vec<String>,
    pub previous_version: Option<String>,
    pub next_version: Option<String>,
}

impl PipelineReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.post_issues.is_empty()
    }
}

pub struct Pipeline<'a> {
    registry: &'a TaskRegistry,
    collaborators: &'a Collaborators,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a TaskRegistry, collaborators: &'a Collaborators) -> Self {
        Self {
            registry,
            collaborators,
        }
    }

    /// Run `sequence` in the given order
    pub fn run<S: AsRef<str>>(
        &self,
        sequence: &[S],
        descriptor: &mut Descriptor,
        options: &ReleaseOptions,
    ) -> Result<PipelineReport> {
        let tasks = sequence
            .iter()
            .map(|name| self.registry.get(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut context = TaskContext::new(descriptor, options, self.collaborators);
        let mut report = PipelineReport::default();

        let runnable = self.validate(&tasks, &context, options, &mut report)?;

        for task in &runnable {
            tracing::info!(task = task.name(), pretend = options.pretend, "Running task");
            task.run(&mut context)?;
            report.executed.push(task.name().to_string());
        }

        if !context.state.commit.is_empty() {
            let message = format!("Released {} {}", context.name(), context.version());
            context.flush_commit(&message)?;
        }

        for task in &runnable {
            report.post_issues.extend(
                task.post_validate(&context)
                    .into_iter()
                    .map(|issue| format!("{}: {}", task.name(), issue)),
            );
        }

        report.previous_version = context.state.previous_version.take();
        report.next_version = context.state.next_version.take();
        report.messages = std::mem::take(&mut context.state.messages);
        Ok(report)
    }

    /// Pre-validate every task, returning those allowed to run
    fn validate<'t>(
        &self,
        tasks: &[&'t dyn Task],
        context: &TaskContext,
        options: &ReleaseOptions,
        report: &mut PipelineReport,
    ) -> Result<Vec<&'t dyn Task>> {
        let mut runnable = Vec::new();
        let mut issues = Vec::new();

        for task in tasks {
            let task_issues = task.pre_validate(context);
            if task_issues.is_empty() {
                runnable.push(*task);
            } else if task.skippable(options) {
                for issue in task_issues {
                    tracing::warn!(task = task.name(), "Skipping task: {}", issue);
                    report
                        .warnings
                        .push(format!("Skipped {}: {}", task.name(), issue));
                }
            } else {
                issues.extend(
                    task_issues
                        .into_iter()
                        .map(|issue| format!("{}: {}", task.name(), issue)),
                );
            }
        }

        if issues.is_empty() {
            Ok(runnable)
        } else {
            Err(ReleaseError::ValidationFailed { issues })
        }
    }
}
