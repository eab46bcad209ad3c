//! CLI error type with exit code handling
//!
//! Library errors are folded into [`CliError`] at the edge so each failure
//! maps onto one exit code and renders through miette.

use miette::Diagnostic;
use thiserror::Error;
use wharf_core::CoreError;
use wharf_release::ReleaseError;
use wharf_repo::RepoError;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Version, metadata or release validation failed
    #[error("Validation failed: {message}")]
    #[diagnostic(code(wharf::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Dependency resolution or installation failed
    #[error("Resolution failed: {message}")]
    #[diagnostic(code(wharf::cli::resolution))]
    Resolution {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A release task failed or left issues behind
    #[error("Release failed: {message}")]
    #[diagnostic(code(wharf::cli::release))]
    Release {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Bad arguments or configuration
    #[error("{message}")]
    #[diagnostic(code(wharf::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(wharf::cli::io))]
    Io { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(wharf::cli::internal))]
    Internal { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Resolution { .. } => exit_codes::RESOLUTION_ERROR,
            CliError::Release { .. } => exit_codes::RELEASE_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
            help: None,
        }
    }

    pub fn release_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Release {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Io(_) => CliError::Io { message },
            CoreError::DescriptorNotFound { .. } => CliError::Validation {
                message,
                help: Some("Run wharf inside a component checkout or pass its path".to_string()),
            },
            CoreError::ProcessFailed { .. } | CoreError::ProcessTimeout { .. } => {
                CliError::internal(message)
            }
            _ => CliError::validation(message),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Core(core) => core.into(),
            RepoError::InvalidConfig { .. } | RepoError::InvalidUrl { .. } => CliError::Usage {
                message: err.to_string(),
                help: Some("Check the channels section of .wharf.yaml".to_string()),
            },
            RepoError::ChannelNotFound { .. } => CliError::Usage {
                message: err.to_string(),
                help: Some("Add the channel to the configuration or pass --no-remote".to_string()),
            },
            RepoError::Io(e) => e.into(),
            other => CliError::resolution(other.to_string()),
        }
    }
}

impl From<ReleaseError> for CliError {
    fn from(err: ReleaseError) -> Self {
        match err {
            ReleaseError::ValidationFailed { .. } => CliError::Validation {
                message: err.to_string(),
                help: Some("Fix the issues or rerun with --skip-invalid".to_string()),
            },
            ReleaseError::UnknownTask { .. } | ReleaseError::UnknownSequence { .. } => {
                CliError::usage(err.to_string())
            }
            ReleaseError::Core(core) => core.into(),
            ReleaseError::Repo(repo) => repo.into(),
            ReleaseError::Io(e) => e.into(),
            other => CliError::Release {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_the_source_error() {
        let invalid: CliError = CoreError::InvalidVersion {
            version: "1.x".to_string(),
        }
        .into();
        assert_eq!(invalid.exit_code(), exit_codes::VALIDATION_ERROR);

        let unknown: CliError = ReleaseError::UnknownTask {
            name: "deploy".to_string(),
            suggestion: None,
        }
        .into();
        assert_eq!(unknown.exit_code(), exit_codes::USAGE_ERROR);

        let unresolved: CliError = RepoError::ResolutionFailed {
            message: "no release of Util".to_string(),
        }
        .into();
        assert_eq!(unresolved.exit_code(), exit_codes::RESOLUTION_ERROR);

        let nested: CliError = ReleaseError::Repo(RepoError::Core(CoreError::InvalidVersion {
            version: "1.x".to_string(),
        }))
        .into();
        assert_eq!(nested.exit_code(), exit_codes::VALIDATION_ERROR);
    }
}
