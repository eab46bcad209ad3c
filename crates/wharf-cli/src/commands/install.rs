//! Install command - install a component together with its dependencies

use console::style;
use std::path::Path;
use std::rc::Rc;

use wharf_core::process::split_command;
use wharf_core::{Descriptor, ProcessRunner, SystemProcess};
use wharf_repo::{CommandInstaller, Component, InstallMode, Installer, WharfConfig};

use super::{ResolveArgs, resolver};
use crate::display::{self, IssueReport, pluralize};
use crate::error::{CliError, Result};

pub fn run(
    path: &Path,
    export: Option<&Path>,
    args: &ResolveArgs,
    config: &WharfConfig,
    pretend: bool,
) -> Result<()> {
    let root = Component::source(Descriptor::load(path)?);
    let options = args.options(config)?;
    let resolver = resolver(config, &options)?;

    let command = split_command(&config.install_command)?;
    if command.is_empty() {
        return Err(CliError::usage("install_command is empty"));
    }
    let runner: Rc<dyn ProcessRunner> = Rc::new(SystemProcess::new(config.process_timeout));
    let backend = CommandInstaller::new(command, path.to_path_buf(), runner);

    let mode = match export {
        Some(cache) => InstallMode::Export {
            cache: cache.to_path_buf(),
        },
        None => InstallMode::Direct,
    };

    display::header(&format!(
        "Installing {} {}{}",
        root.name(),
        root.version()?,
        if pretend { " (pretend)" } else { "" }
    ));

    let mut installer = Installer::new(&resolver, &options, &backend)
        .mode(mode)
        .pretend(pretend);
    installer.install_tree(&root)?;
    let report = installer.into_report();

    for message in &report.messages {
        println!("  {}", message);
    }
    if !report.warnings.is_empty() {
        let mut issues = IssueReport::new();
        for warning in &report.warnings {
            issues.add_warning(warning.as_str());
        }
        issues.display();
    }

    let count = pluralize(report.installed.len(), "component", "components");
    if pretend {
        println!("{} Would install {}", style("→").blue(), count);
    } else {
        display::success(&format!("Installed {}", count));
    }
    Ok(())
}
