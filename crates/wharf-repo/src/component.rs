//! Concrete components
//!
//! A component is whatever a dependency reference resolved to: a source
//! checkout, a local archive or a release on a remote channel.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use wharf_core::archive::{archive_name, create_archive, read_metadata_from_archive};
use wharf_core::{ComponentMetadata, Dependency, Descriptor, MetadataStore, Stability};

use crate::error::{RepoError, Result};
use crate::remote::RemoteChannel;

/// How [`Component::place_archive`] obtained the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Downloaded,
    Built,
    Copied,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Placement::Downloaded => "downloaded from network",
            Placement::Built => "built package from source",
            Placement::Copied => "copied archive",
        })
    }
}

/// A component checked out from version control
#[derive(Debug)]
pub struct SourceComponent {
    pub descriptor: Descriptor,
}

/// A `name-version.tgz` on disk
#[derive(Debug)]
pub struct ArchiveComponent {
    pub path: PathBuf,
    pub metadata: ComponentMetadata,
}

/// A release on a remote channel, bound to one stability
pub struct RemoteComponent {
    channel: Rc<dyn RemoteChannel>,
    name: String,
    stability: Stability,
    version: OnceCell<String>,
    metadata: OnceCell<ComponentMetadata>,
}

impl RemoteComponent {
    pub fn new(channel: Rc<dyn RemoteChannel>, name: impl Into<String>, stability: Stability) -> Self {
        Self {
            channel,
            name: name.into(),
            stability,
            version: OnceCell::new(),
            metadata: OnceCell::new(),
        }
    }

    /// Seed the version when the caller already knows it
    pub fn with_version(self, version: impl Into<String>) -> Self {
        let _ = self.version.set(version.into());
        self
    }

    pub fn stability(&self) -> Stability {
        self.stability
    }

    pub fn version(&self) -> Result<&str> {
        self.version
            .get_or_try_init(|| {
                self.channel
                    .latest_release(&self.name, self.stability)?
                    .ok_or_else(|| RepoError::ResolutionFailed {
                        message: format!(
                            "No {} release of {} on channel {}",
                            self.stability,
                            self.name,
                            self.channel.name()
                        ),
                    })
            })
            .map(String::as_str)
    }

    pub fn metadata(&self) -> Result<&ComponentMetadata> {
        self.metadata.get_or_try_init(|| {
            let version = self.version()?;
            self.channel.fetch_metadata(&self.name, version)
        })
    }
}

impl fmt::Debug for RemoteComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteComponent")
            .field("channel", &self.channel.name())
            .field("name", &self.name)
            .field("stability", &self.stability)
            .field("version", &self.version.get())
            .finish()
    }
}

#[derive(Debug)]
pub enum Component {
    Source(SourceComponent),
    Archive(ArchiveComponent),
    Remote(RemoteComponent),
}

impl Component {
    pub fn source(descriptor: Descriptor) -> Self {
        Component::Source(SourceComponent { descriptor })
    }

    /// Open a local archive, reading its embedded descriptor
    pub fn archive(path: &Path) -> Result<Self> {
        let metadata = read_metadata_from_archive(path)?;
        Ok(Component::Archive(ArchiveComponent {
            path: path.to_path_buf(),
            metadata,
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            Component::Source(c) => &c.descriptor.metadata().name,
            Component::Archive(c) => &c.metadata.name,
            Component::Remote(c) => &c.name,
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            Component::Source(c) => &c.descriptor.metadata().channel,
            Component::Archive(c) => &c.metadata.channel,
            Component::Remote(c) => c.channel.name(),
        }
    }

    pub fn version(&self) -> Result<String> {
        Ok(match self {
            Component::Source(c) => c.descriptor.metadata().version.release.clone(),
            Component::Archive(c) => c.metadata.version.release.clone(),
            Component::Remote(c) => c.version()?.to_string(),
        })
    }

    pub fn stability(&self) -> Stability {
        match self {
            Component::Source(c) => c.descriptor.metadata().stability.release,
            Component::Archive(c) => c.metadata.stability.release,
            Component::Remote(c) => c.stability,
        }
    }

    pub fn metadata(&self) -> Result<&ComponentMetadata> {
        match self {
            Component::Source(c) => Ok(c.descriptor.metadata()),
            Component::Archive(c) => Ok(&c.metadata),
            Component::Remote(c) => c.metadata(),
        }
    }

    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        Ok(self.metadata()?.dependencies()?)
    }

    /// What an installer is pointed at
    pub fn install_target(&self) -> Result<String> {
        Ok(match self {
            Component::Source(c) => c.descriptor.root().display().to_string(),
            Component::Archive(c) => c.path.display().to_string(),
            Component::Remote(c) => format!("{}/{}-{}", c.channel.name(), c.name, c.version()?),
        })
    }

    /// Materialize the component as an archive inside `dest`
    pub fn place_archive(&self, dest: &Path) -> Result<(PathBuf, Placement)> {
        std::fs::create_dir_all(dest)?;
        match self {
            Component::Source(c) => {
                let metadata = c.descriptor.metadata();
                let output = dest.join(archive_name(&metadata.name, &metadata.version.release));
                create_archive(c.descriptor.root(), metadata, &output)?;
                Ok((output, Placement::Built))
            }
            Component::Archive(c) => {
                let file_name = c.path.file_name().ok_or_else(|| RepoError::ResolutionFailed {
                    message: format!("Invalid archive path {}", c.path.display()),
                })?;
                let output = dest.join(file_name);
                if output != c.path {
                    std::fs::copy(&c.path, &output)?;
                }
                Ok((output, Placement::Copied))
            }
            Component::Remote(c) => {
                let output = c.channel.download(&c.name, c.version()?, dest)?;
                Ok((output, Placement::Downloaded))
            }
        }
    }

    /// Where the component came from, for display
    pub fn source_label(&self) -> String {
        match self {
            Component::Source(c) => format!("source {}", c.descriptor.root().display()),
            Component::Archive(c) => format!("archive {}", c.path.display()),
            Component::Remote(c) => format!("remote {} ({})", c.channel.name(), c.stability),
        }
    }
}
