//! Deps command - list the dependency tree of a component

use console::style;
use std::path::Path;

use wharf_core::Descriptor;
use wharf_repo::{Annotation, Component, GraphWalker, WharfConfig, render_tree};

use super::{ResolveArgs, resolver};
use crate::display::{IssueReport, pluralize};
use crate::error::Result;

pub fn run(path: &Path, args: &ResolveArgs, config: &WharfConfig) -> Result<()> {
    let root = Component::source(Descriptor::load(path)?);
    let options = args.options(config)?;
    let resolver = resolver(config, &options)?;

    let entries = GraphWalker::new(&resolver, &options).list(&root)?;
    let title = format!("{} {}", style(root.name()).bold(), root.version()?);
    println!("{}", render_tree(&title, &entries));

    let mut issues = IssueReport::new();
    for entry in &entries {
        if let Annotation::Unresolved { .. } = entry.annotation {
            let message = format!("{} {}", entry.key, entry.annotation);
            if entry.required {
                issues.add_error(message);
            } else {
                issues.add_warning(message);
            }
        }
    }

    println!();
    if issues.is_empty() {
        println!("{}", pluralize(entries.len(), "dependency", "dependencies"));
    } else {
        let (errors, warnings) = issues.summary();
        println!(
            "{}, {} unresolved",
            pluralize(entries.len(), "dependency", "dependencies"),
            errors + warnings
        );
        issues.display();
    }
    Ok(())
}
