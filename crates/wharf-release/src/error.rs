//! Release pipeline errors

use thiserror::Error;
use wharf_core::CoreError;
use wharf_repo::RepoError;

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Release validation failed:\n{}", format_issues(.issues))]
    ValidationFailed { issues: Vec<String> },

    #[error("Unknown release task '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownTask {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Unknown release sequence '{name}'")]
    UnknownSequence { name: String },

    #[error("Task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("Version control error: {message}")]
    Vcs { message: String },

    #[error("Mail delivery failed: {message}")]
    Mail { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReleaseError>;

fn format_issues(issues: &[String]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}
