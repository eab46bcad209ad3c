//! Built-in release tasks

mod files;
mod package;
mod publish;
mod scm;

pub use files::{ChangelogTask, NextVersionTask, TimestampTask};
pub use package::{PackageTask, TestTask};
pub use publish::{AnnounceTask, PublishTask, TrackerTask};
pub use scm::{BranchTask, CommitTask, PushTask, TagTask};
