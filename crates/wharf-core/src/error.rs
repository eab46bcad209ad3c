//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid version: \"{version}\"")]
    InvalidVersion { version: String },

    #[error("{kind} version \"{version}\" is not valid for {kind} stability \"{stability}\"")]
    StabilityMismatch {
        kind: &'static str,
        version: String,
        stability: String,
    },

    #[error("Unknown stability: \"{value}\" (expected stable, beta, alpha or devel)")]
    UnknownStability { value: String },

    #[error("Unsupported constraint format: \"{constraint}\"")]
    UnsupportedConstraintFormat { constraint: String },

    #[error("Unknown dependency type \"{kind}\" for dependency {name}")]
    UnknownDependencyType { name: String, kind: String },

    #[error("Unknown metadata field: {field}")]
    UnknownField { field: String },

    #[error("Component descriptor not found: {path}")]
    DescriptorNotFound { path: String },

    #[error("Invalid component descriptor: {message}")]
    InvalidDescriptor { message: String },

    #[error("Invalid instruction: {message}")]
    InvalidInstruction { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Command `{command}` failed with exit code {code}: {output}")]
    ProcessFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Invalid command line `{command}`: {message}")]
    InvalidCommand { command: String, message: String },

    #[error("Command `{command}` timed out after {seconds}s")]
    ProcessTimeout { command: String, seconds: u64 },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
