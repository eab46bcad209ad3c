//! Wharf Repo - finding components and walking their dependencies
//!
//! This crate turns dependency references into concrete components:
//! - Remote channels reached through a blocking [`HttpClient`]
//! - An ordered list of sourcing strategies ([`Strategy`])
//! - Dependency listing and installation over the resolved graph
//!
//! # Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use wharf_repo::{Channels, ComponentResolver, ReqwestClient, ResolutionOptions, WharfConfig};
//!
//! # fn example() -> wharf_repo::Result<()> {
//! let config = WharfConfig::load(None)?;
//! let client = Rc::new(ReqwestClient::new(config.http_timeout)?);
//! let resolver = ComponentResolver::new(Channels::from_config(&config, client));
//! let options = ResolutionOptions::from_config(&config);
//! let util = resolver.resolve("Util", &config.home_channel, &options)?;
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod remote;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use component::{Component, Placement};
pub use config::{Announce, Channel, WharfConfig};
pub use error::{RepoError, Result};
pub use graph::{
    Annotation, CommandInstaller, GraphWalker, InstallBackend, InstallMode, InstallReport,
    Installer, ListEntry, render_tree,
};
pub use http::{HttpClient, ReqwestClient};
pub use remote::{Channels, HttpChannel, RemoteChannel};
pub use resolver::{ComponentResolver, ResolutionOptions, Strategy, parse_order};
