//! CLI actions

pub mod deps;
pub mod install;
pub mod release;
pub mod snapshot;
pub mod update;
pub mod version;

use clap::Args;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use wharf_core::{InstructionRule, Stability};
use wharf_repo::{
    Channels, ComponentResolver, HttpClient, ReqwestClient, ResolutionOptions, WharfConfig,
    parse_order,
};

use crate::error::Result;

/// Flags shared by the actions that walk the dependency graph
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Include optional dependencies
    #[arg(long)]
    pub optional: bool,

    /// Only use local checkouts and archives
    #[arg(long)]
    pub no_remote: bool,

    /// Comma separated strategy order (git, snapshot, stable, beta, alpha, devel)
    #[arg(long, value_name = "STRATEGIES")]
    pub order: Option<String>,

    /// Stability tried first when fetching from a channel
    #[arg(long)]
    pub stability: Option<Stability>,

    /// Directory searched for component archives
    #[arg(long)]
    pub sourcepath: Option<PathBuf>,

    /// Per-component instructions, e.g. `pear.horde.org/Util=include,git`
    #[arg(long = "instruction", value_name = "SELECTOR=INSTRUCTIONS")]
    pub instructions: Vec<InstructionRule>,
}

impl ResolveArgs {
    /// Configuration defaults overridden by the command line
    pub fn options(&self, config: &WharfConfig) -> Result<ResolutionOptions> {
        let mut options = ResolutionOptions::from_config(config);
        options.include_optional = self.optional;
        options.allow_remote = !self.no_remote;
        options.stability = self.stability;
        if let Some(order) = &self.order {
            options.order = Some(parse_order(order)?);
        }
        if let Some(sourcepath) = &self.sourcepath {
            options.sourcepath = Some(sourcepath.clone());
        }
        options
            .instructions
            .extend(self.instructions.iter().cloned().collect());
        Ok(options)
    }
}

/// Resolver over the configured channels
///
/// No HTTP client is built when remote access is disabled.
pub fn resolver(config: &WharfConfig, options: &ResolutionOptions) -> Result<ComponentResolver> {
    let channels = if options.allow_remote {
        Channels::from_config(config, http_client(config.http_timeout)?)
    } else {
        Channels::new()
    };
    Ok(ComponentResolver::new(channels))
}

pub fn http_client(timeout: Duration) -> Result<Rc<dyn HttpClient>> {
    Ok(Rc::new(ReqwestClient::new(timeout)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wharf_core::Instruction;
    use wharf_repo::Strategy;

    #[test]
    fn test_flags_override_config() {
        let mut config = WharfConfig::default();
        config.sourcepath = Some(PathBuf::from("/var/cache/components"));

        let args = ResolveArgs {
            optional: true,
            no_remote: true,
            order: Some("snapshot,git".to_string()),
            instructions: vec!["Util=exclude".parse().unwrap()],
            ..ResolveArgs::default()
        };
        let options = args.options(&config).unwrap();

        assert!(options.include_optional);
        assert!(!options.allow_remote);
        assert_eq!(
            options.sourcepath.as_deref(),
            Some(std::path::Path::new("/var/cache/components"))
        );
        assert_eq!(
            options.strategies(),
            [Strategy::LocalSnapshot, Strategy::LocalCheckout]
        );
        assert!(
            options
                .instructions
                .applicable("pear.horde.org", "Util")
                .contains(Instruction::Exclude)
        );
    }

    #[test]
    fn test_bad_order_is_rejected() {
        let args = ResolveArgs {
            order: Some("git,nightly".to_string()),
            ..ResolveArgs::default()
        };
        assert!(args.options(&WharfConfig::default()).is_err());
    }
}
