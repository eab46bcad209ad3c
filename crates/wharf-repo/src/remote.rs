//! Remote registry channels
//!
//! A channel publishes a small REST tree:
//!
//! ```text
//! {url}/rest/r/{name}/{stability}.txt   latest version at that stability
//! {url}/rest/r/{name}/{version}.json    component metadata
//! {url}/get/{name}-{version}.tgz        component archive
//! ```
//!
//! `{name}` is lowercased in REST paths.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use wharf_core::archive::archive_name;
use wharf_core::{ComponentMetadata, Stability, version};

use crate::config::{Channel, WharfConfig};
use crate::error::{RepoError, Result};
use crate::http::HttpClient;

/// Read access to one registry channel
pub trait RemoteChannel {
    fn name(&self) -> &str;

    /// Latest version of `component` released at `stability`
    ///
    /// A component the channel does not know is `Ok(None)`; a transport
    /// failure is an error.
    fn latest_release(&self, component: &str, stability: Stability) -> Result<Option<String>>;

    fn fetch_metadata(&self, component: &str, version: &str) -> Result<ComponentMetadata>;

    /// Download the archive of `component` into `dest`
    fn download(&self, component: &str, version: &str, dest: &Path) -> Result<PathBuf>;
}

/// Channel served over HTTP
pub struct HttpChannel {
    channel: Channel,
    client: Rc<dyn HttpClient>,
}

impl HttpChannel {
    pub fn new(channel: Channel, client: Rc<dyn HttpClient>) -> Self {
        Self { channel, client }
    }

    fn base(&self) -> &str {
        self.channel.url.trim_end_matches('/')
    }

    fn rest_url(&self, component: &str, leaf: &str) -> String {
        format!(
            "{}/rest/r/{}/{}",
            self.base(),
            component.to_lowercase(),
            leaf
        )
    }
}

impl RemoteChannel for HttpChannel {
    fn name(&self) -> &str {
        &self.channel.name
    }

    fn latest_release(&self, component: &str, stability: Stability) -> Result<Option<String>> {
        let url = self.rest_url(component, &format!("{}.txt", stability));
        let version = self
            .client
            .get_text(&url)?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .map(|text| version::validate(&text))
            .transpose()?;
        tracing::debug!(channel = %self.channel.name, component, %stability, ?version, "queried latest release");
        Ok(version)
    }

    fn fetch_metadata(&self, component: &str, version: &str) -> Result<ComponentMetadata> {
        let url = self.rest_url(component, &format!("{}.json", version));
        let body = self
            .client
            .get(&url)?
            .ok_or_else(|| RepoError::ResolutionFailed {
                message: format!(
                    "No metadata for {} {} on channel {}",
                    component, version, self.channel.name
                ),
            })?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn download(&self, component: &str, version: &str, dest: &Path) -> Result<PathBuf> {
        let file = archive_name(component, version);
        let url = format!("{}/get/{}", self.base(), file);
        let body = self
            .client
            .get(&url)?
            .ok_or_else(|| RepoError::ResolutionFailed {
                message: format!("Archive {} not found on channel {}", file, self.channel.name),
            })?;

        std::fs::create_dir_all(dest)?;
        let path = dest.join(file);
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

/// All channels known to one command
#[derive(Default, Clone)]
pub struct Channels {
    channels: BTreeMap<String, Rc<dyn RemoteChannel>>,
}

impl Channels {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP channels for everything in the configuration
    pub fn from_config(config: &WharfConfig, client: Rc<dyn HttpClient>) -> Self {
        let mut channels = Self::new();
        for channel in &config.channels {
            channels.insert(Rc::new(HttpChannel::new(channel.clone(), client.clone())));
        }
        channels
    }

    pub fn insert(&mut self, channel: Rc<dyn RemoteChannel>) {
        self.channels.insert(channel.name().to_string(), channel);
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn RemoteChannel>> {
        self.channels
            .get(name)
            .cloned()
            .ok_or_else(|| RepoError::ChannelNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }
}
