//! Component resolution
//!
//! A dependency reference (`channel/name`) becomes a concrete [`Component`]
//! by trying sourcing strategies in order until one produces a match.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use regex::Regex;
use walkdir::WalkDir;
use wharf_core::{Dependency, Descriptor, Instruction, InstructionRules, Stability, component_key};

use crate::component::{Component, RemoteComponent};
use crate::config::WharfConfig;
use crate::error::{RepoError, Result};
use crate::remote::Channels;

/// One way of obtaining a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Source checkout below the checkout root
    LocalCheckout,
    /// Archive found on the source path
    LocalSnapshot,
    /// Latest release of the given stability on the component's channel
    Remote(Stability),
}

impl Strategy {
    pub const DEFAULT_ORDER: [Strategy; 6] = [
        Strategy::LocalCheckout,
        Strategy::LocalSnapshot,
        Strategy::Remote(Stability::Stable),
        Strategy::Remote(Stability::Beta),
        Strategy::Remote(Stability::Alpha),
        Strategy::Remote(Stability::Devel),
    ];

    pub fn is_remote(&self) -> bool {
        matches!(self, Strategy::Remote(_))
    }

    /// Strategy selected by a source instruction
    pub fn from_instruction(instruction: Instruction) -> Option<Self> {
        match instruction {
            Instruction::Git => Some(Strategy::LocalCheckout),
            Instruction::Snapshot => Some(Strategy::LocalSnapshot),
            Instruction::Remote(stability) => Some(Strategy::Remote(stability)),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::LocalCheckout => f.write_str("git"),
            Strategy::LocalSnapshot => f.write_str("snapshot"),
            Strategy::Remote(stability) => write!(f, "{}", stability),
        }
    }
}

impl FromStr for Strategy {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "git" | "source" => Ok(Strategy::LocalCheckout),
            "snapshot" => Ok(Strategy::LocalSnapshot),
            other => other
                .parse::<Stability>()
                .map(Strategy::Remote)
                .map_err(|_| RepoError::InvalidConfig {
                    message: format!(
                        "unknown resolution strategy '{}' (expected git, snapshot, stable, beta, alpha or devel)",
                        other
                    ),
                }),
        }
    }
}

/// Parse a comma separated strategy list
pub fn parse_order(s: &str) -> Result<Vec<Strategy>> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Read-only resolution settings for one command
#[derive(Debug, Clone)]
pub struct ResolutionOptions {
    /// Attempt order override
    pub order: Option<Vec<Strategy>>,
    /// Stability tried first among the remote strategies
    pub stability: Option<Stability>,
    pub allow_remote: bool,
    /// Directory searched for archives
    pub sourcepath: Option<PathBuf>,
    pub include_optional: bool,
    pub instructions: InstructionRules,
    /// Channel whose components live in `checkout_root`
    pub home_channel: String,
    pub checkout_root: Option<PathBuf>,
    /// Key of the installer's own package, never listed or installed
    pub installer_self: String,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            order: None,
            stability: None,
            allow_remote: true,
            sourcepath: None,
            include_optional: false,
            instructions: InstructionRules::default(),
            home_channel: "pear.horde.org".to_string(),
            checkout_root: None,
            installer_self: "pear.php.net/PEAR".to_string(),
        }
    }
}

impl ResolutionOptions {
    /// Defaults taken from the configuration file
    pub fn from_config(config: &WharfConfig) -> Self {
        Self {
            sourcepath: config.sourcepath.clone(),
            instructions: config.instructions.clone(),
            home_channel: config.home_channel.clone(),
            checkout_root: config.checkout_root.clone(),
            ..Self::default()
        }
    }

    /// Attempt order without per-component instructions
    pub fn strategies(&self) -> Vec<Strategy> {
        let order = match &self.order {
            Some(order) => order.clone(),
            None => {
                let mut order = Strategy::DEFAULT_ORDER.to_vec();
                if let Some(preferred) = self.stability {
                    let preferred = Strategy::Remote(preferred);
                    order.retain(|s| *s != preferred);
                    let first_remote = order.iter().position(Strategy::is_remote).unwrap_or(order.len());
                    order.insert(first_remote, preferred);
                }
                order
            }
        };
        self.restrict(order)
    }

    /// Attempt order for one component, honouring its source instructions
    pub fn strategies_for(&self, channel: &str, name: &str) -> Vec<Strategy> {
        let sources: Vec<Strategy> = self
            .instructions
            .applicable(channel, name)
            .sources()
            .into_iter()
            .filter_map(Strategy::from_instruction)
            .collect();
        if sources.is_empty() {
            self.strategies()
        } else {
            self.restrict(sources)
        }
    }

    fn restrict(&self, mut order: Vec<Strategy>) -> Vec<Strategy> {
        if !self.allow_remote {
            order.retain(|s| !s.is_remote());
        }
        order
    }
}

type CacheKey = (String, Vec<Strategy>, Option<PathBuf>);

/// Resolves references into components, memoizing the results
pub struct ComponentResolver {
    channels: Channels,
    cache: RefCell<HashMap<CacheKey, Option<Rc<Component>>>>,
}

impl ComponentResolver {
    pub fn new(channels: Channels) -> Self {
        Self {
            channels,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve `channel/name` with the strategies applicable to it
    pub fn resolve(
        &self,
        name: &str,
        channel: &str,
        options: &ResolutionOptions,
    ) -> Result<Option<Rc<Component>>> {
        let strategies = options.strategies_for(channel, name);
        self.resolve_with(name, channel, &strategies, options)
    }

    pub fn resolve_dependency(
        &self,
        dependency: &Dependency,
        options: &ResolutionOptions,
    ) -> Result<Option<Rc<Component>>> {
        self.resolve(&dependency.name, &dependency.channel, options)
    }

    /// Resolve with an explicit strategy list
    ///
    /// The first strategy yielding a component wins; exhausting the list is
    /// `Ok(None)`.
    pub fn resolve_with(
        &self,
        name: &str,
        channel: &str,
        strategies: &[Strategy],
        options: &ResolutionOptions,
    ) -> Result<Option<Rc<Component>>> {
        let key = (
            component_key(channel, name),
            strategies.to_vec(),
            options.sourcepath.clone(),
        );
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }

        let mut found = None;
        for strategy in strategies {
            tracing::debug!(component = %key.0, %strategy, "trying strategy");
            let attempt = match strategy {
                Strategy::LocalCheckout => self.local_checkout(name, channel, options),
                Strategy::LocalSnapshot => self.local_snapshot(name, options),
                Strategy::Remote(stability) => self.remote(name, channel, *stability, options)?,
            };
            if let Some(component) = attempt {
                tracing::debug!(component = %key.0, %strategy, "resolved");
                found = Some(Rc::new(component));
                break;
            }
        }

        self.cache.borrow_mut().insert(key, found.clone());
        Ok(found)
    }

    fn local_checkout(
        &self,
        name: &str,
        channel: &str,
        options: &ResolutionOptions,
    ) -> Option<Component> {
        if channel != options.home_channel {
            return None;
        }
        let root = options.checkout_root.as_deref()?;

        let mut candidates = vec![name];
        if let Some((_, short)) = name.split_once('_') {
            candidates.push(short);
        }

        for candidate in candidates {
            match Descriptor::load(&root.join(candidate)) {
                Ok(descriptor) => return Some(Component::source(descriptor)),
                Err(e) => {
                    tracing::debug!(component = name, checkout = candidate, error = %e, "no usable checkout");
                }
            }
        }
        None
    }

    fn local_snapshot(&self, name: &str, options: &ResolutionOptions) -> Option<Component> {
        let sourcepath = options.sourcepath.as_deref()?;
        let path = find_snapshot(sourcepath, name)?;
        match Component::archive(&path) {
            Ok(component) => Some(component),
            Err(e) => {
                tracing::debug!(archive = %path.display(), error = %e, "unreadable archive");
                None
            }
        }
    }

    fn remote(
        &self,
        name: &str,
        channel: &str,
        stability: Stability,
        options: &ResolutionOptions,
    ) -> Result<Option<Component>> {
        if !options.allow_remote {
            return Ok(None);
        }
        let Ok(remote) = self.channels.get(channel) else {
            tracing::debug!(channel, "channel not configured");
            return Ok(None);
        };
        Ok(remote.latest_release(name, stability)?.map(|version| {
            Component::Remote(RemoteComponent::new(remote, name, stability).with_version(version))
        }))
    }
}

/// First `name-<version>.tgz` below `root`, in file name order
pub fn find_snapshot(root: &Path, name: &str) -> Option<PathBuf> {
    let pattern = format!(
        r"^{}-\d+\.\d+\.\d+(?:alpha\d*|beta\d*|RC\d+|dev\d*)?\.tgz$",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| re.is_match(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
}
