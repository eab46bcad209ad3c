//! Release pipeline for Wharf components
//!
//! A release is a sequence of named [`Task`]s run against the descriptor of
//! one component checkout. The [`Pipeline`] validates every task before the
//! first one runs, shares one [`RunState`] between them and leaves the
//! repository untouched in pretend mode.
//!
//! ```no_run
//! use std::path::Path;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use wharf_core::{Descriptor, SystemProcess};
//! use wharf_release::{
//!     Collaborators, Pipeline, ReleaseOptions, SendmailMailer, Sequences, SystemGit,
//!     TaskRegistry,
//! };
//! use wharf_repo::ReqwestClient;
//!
//! let runner = Rc::new(SystemProcess::default());
//! let collaborators = Collaborators {
//!     vcs: Rc::new(SystemGit::new(runner.clone())),
//!     runner: runner.clone(),
//!     http: Rc::new(ReqwestClient::new(Duration::from_secs(30))?),
//!     mailer: Rc::new(SendmailMailer::new(runner)),
//! };
//!
//! let mut options = ReleaseOptions::new(chrono::Local::now().date_naive());
//! options.pretend = true;
//!
//! let registry = TaskRegistry::with_defaults();
//! let sequence = Sequences::default().expand("release:default")?;
//! let mut descriptor = Descriptor::load(Path::new("components/Util"))?;
//! let report = Pipeline::new(&registry, &collaborators).run(&sequence, &mut descriptor, &options)?;
//! for message in &report.messages {
//!     println!("{}", message);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod mail;
pub mod options;
pub mod pipeline;
pub mod sequence;
pub mod task;
pub mod tasks;
pub mod vcs;

pub use error::{ReleaseError, Result};
pub use mail::{Mail, Mailer, SendmailMailer};
pub use options::{CommitBatch, ReleaseOptions, RunState};
pub use pipeline::{Pipeline, PipelineReport};
pub use sequence::{CANONICAL_ORDER, Sequences};
pub use task::{Collaborators, Task, TaskContext, TaskRegistry};
pub use vcs::{SystemGit, Vcs};
