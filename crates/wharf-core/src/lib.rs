//! Wharf Core - shared types for the component release tool
//!
//! This crate provides the foundational types used throughout Wharf:
//! - `version`: Version normalization, stability checks and constraint conversion
//! - `metadata`: Component descriptors (`component.yaml`)
//! - `dependency`: Dependency descriptors
//! - `changelog`: Release history (`changelog.yml`, `CHANGES`)
//! - `instructions`: Per-component resolution overrides
//! - `archive`: Component archives
//! - `process`: External command execution

pub mod archive;
pub mod changelog;
pub mod dependency;
pub mod error;
pub mod instructions;
pub mod metadata;
pub mod process;
pub mod version;

pub use changelog::{Changelog, ChangelogEntry};
pub use dependency::{Dependency, DependencyEntry, DependencyKind, component_key};
pub use error::{CoreError, Result};
pub use instructions::{Instruction, InstructionRule, InstructionRules, InstructionSet, Selector};
pub use metadata::{ComponentMetadata, Descriptor, Field, MetadataStore};
pub use process::{ProcessOutput, ProcessRunner, SystemProcess};
pub use version::{LegacyConstraint, Stability};
