//! Dependency graph traversal
//!
//! Listing and installation share the same walk: one visited map keyed by
//! `channel/name`, scoped to a single traversal. A node seen again after
//! its expansion finished is "already listed"; a node seen again while
//! still being expanded closes a cycle.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use wharf_core::{Dependency, Instruction, ProcessRunner, component_key};

use crate::component::Component;
use crate::error::{RepoError, Result};
use crate::resolver::{ComponentResolver, ResolutionOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Visited map of one traversal
#[derive(Debug, Default)]
struct Visited {
    nodes: HashMap<String, (Visit, String)>,
}

impl Visited {
    fn state(&self, key: &str) -> Option<&(Visit, String)> {
        self.nodes.get(key)
    }

    fn enter(&mut self, key: &str, parent: &str) {
        self.nodes
            .insert(key.to_string(), (Visit::InProgress, parent.to_string()));
    }

    fn finish(&mut self, key: &str) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.0 = Visit::Done;
        }
    }
}

/// Outcome of visiting one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Resolved { source: String, version: String },
    /// Runtime extension or other non-package dependency
    External,
    /// No strategy produced a component
    Unresolved { reason: Option<String> },
    AlreadyListed { parent: String },
    Recursion,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Resolved { source, version } => write!(f, "{} [{}]", version, source),
            Annotation::External => f.write_str("[external]"),
            Annotation::Unresolved { reason: None } => f.write_str("[unresolved]"),
            Annotation::Unresolved { reason: Some(reason) } => {
                write!(f, "[unresolved: {}]", reason)
            }
            Annotation::AlreadyListed { parent } => {
                write!(f, "[already listed under {}]", parent)
            }
            Annotation::Recursion => f.write_str("[recursion]"),
        }
    }
}

/// One line of a dependency listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// 1 for direct dependencies of the root
    pub depth: usize,
    pub key: String,
    pub name: String,
    pub channel: String,
    pub required: bool,
    pub annotation: Annotation,
}

/// Whether a dependency takes part in listing and installation
pub fn is_selected(dependency: &Dependency, options: &ResolutionOptions) -> bool {
    if dependency.is_runtime() || dependency.key() == options.installer_self {
        return false;
    }
    let instructions = options
        .instructions
        .applicable(&dependency.channel, &dependency.name);
    if instructions.contains(Instruction::Exclude) {
        return false;
    }
    if instructions.contains(Instruction::Include) {
        return true;
    }
    dependency.required || options.include_optional
}

fn skips_dependencies(dependency: &Dependency, options: &ResolutionOptions) -> bool {
    options
        .instructions
        .applicable(&dependency.channel, &dependency.name)
        .contains(Instruction::NoDeps)
}

/// Lists the dependency tree of a component
pub struct GraphWalker<'a> {
    resolver: &'a ComponentResolver,
    options: &'a ResolutionOptions,
}

impl<'a> GraphWalker<'a> {
    pub fn new(resolver: &'a ComponentResolver, options: &'a ResolutionOptions) -> Self {
        Self { resolver, options }
    }

    /// Depth-first listing below `root`
    pub fn list(&self, root: &Component) -> Result<Vec<ListEntry>> {
        let mut visited = Visited::default();
        let mut entries = Vec::new();
        let root_key = component_key(root.channel(), root.name());
        visited.enter(&root_key, "");
        self.walk(root, &root_key, 1, &mut visited, &mut entries)?;
        visited.finish(&root_key);
        Ok(entries)
    }

    fn walk(
        &self,
        component: &Component,
        parent: &str,
        depth: usize,
        visited: &mut Visited,
        entries: &mut Vec<ListEntry>,
    ) -> Result<()> {
        for dependency in component.dependencies()? {
            if !is_selected(&dependency, self.options) {
                continue;
            }
            let key = dependency.key();
            let entry = |annotation| ListEntry {
                depth,
                key: key.clone(),
                name: dependency.name.clone(),
                channel: dependency.channel.clone(),
                required: dependency.required,
                annotation,
            };

            if !dependency.is_package() {
                entries.push(entry(Annotation::External));
                continue;
            }

            match visited.state(&key) {
                Some((Visit::InProgress, _)) => {
                    entries.push(entry(Annotation::Recursion));
                    continue;
                }
                Some((Visit::Done, first_parent)) => {
                    let parent = first_parent.clone();
                    entries.push(entry(Annotation::AlreadyListed { parent }));
                    continue;
                }
                None => {}
            }

            visited.enter(&key, parent);
            match self.resolver.resolve_dependency(&dependency, self.options) {
                Ok(Some(resolved)) => {
                    entries.push(entry(Annotation::Resolved {
                        source: resolved.source_label(),
                        version: resolved.version()?,
                    }));
                    if !skips_dependencies(&dependency, self.options) {
                        self.walk(&resolved, &key, depth + 1, visited, entries)?;
                    }
                }
                Ok(None) => entries.push(entry(Annotation::Unresolved { reason: None })),
                Err(e) => entries.push(entry(Annotation::Unresolved {
                    reason: Some(e.to_string()),
                })),
            }
            visited.finish(&key);
        }
        Ok(())
    }
}

/// Render a listing as a tree below `root`
pub fn render_tree(root: &str, entries: &[ListEntry]) -> String {
    let mut lines = vec![root.to_string()];
    // Whether the ancestor at each depth was the last of its siblings
    let mut last_at_depth: Vec<bool> = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        let is_last = entries[i + 1..]
            .iter()
            .find(|e| e.depth <= entry.depth)
            .is_none_or(|e| e.depth < entry.depth);

        last_at_depth.truncate(entry.depth.saturating_sub(1));
        let mut prefix = String::new();
        for ancestor_last in &last_at_depth {
            prefix.push_str(if *ancestor_last { "    " } else { "│   " });
        }
        let connector = if is_last { "└── " } else { "├── " };
        let optional = if entry.required { "" } else { " (optional)" };
        lines.push(format!(
            "{}{}{}{} {}",
            prefix, connector, entry.key, optional, entry.annotation
        ));
        last_at_depth.push(is_last);
    }

    lines.join("\n")
}

/// Performs the actual installation of one component
pub trait InstallBackend {
    fn install(&self, target: &str) -> Result<()>;
}

/// Runs the configured install command with the target appended
pub struct CommandInstaller {
    command: Vec<String>,
    cwd: PathBuf,
    runner: Rc<dyn ProcessRunner>,
}

impl CommandInstaller {
    pub fn new(command: Vec<String>, cwd: PathBuf, runner: Rc<dyn ProcessRunner>) -> Self {
        Self {
            command,
            cwd,
            runner,
        }
    }
}

impl InstallBackend for CommandInstaller {
    fn install(&self, target: &str) -> Result<()> {
        let mut command = self.command.clone();
        command.push(target.to_string());
        self.runner.check(&command, &self.cwd)?;
        Ok(())
    }
}

/// Where installed components come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMode {
    /// Install whatever the resolver produced
    Direct,
    /// Materialize every component into `cache` first and install from there
    Export { cache: PathBuf },
}

/// Result of an installation run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Keys in installation order
    pub installed: Vec<String>,
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
}

/// Installs a component together with its dependencies
///
/// Dependencies are installed depth-first before their dependents. The
/// installed set spans every `install_tree` call made on one installer.
pub struct Installer<'a> {
    resolver: &'a ComponentResolver,
    options: &'a ResolutionOptions,
    backend: &'a dyn InstallBackend,
    mode: InstallMode,
    pretend: bool,
    installed: HashSet<String>,
    report: InstallReport,
}

impl<'a> Installer<'a> {
    pub fn new(
        resolver: &'a ComponentResolver,
        options: &'a ResolutionOptions,
        backend: &'a dyn InstallBackend,
    ) -> Self {
        Self {
            resolver,
            options,
            backend,
            mode: InstallMode::Direct,
            pretend: false,
            installed: HashSet::new(),
            report: InstallReport::default(),
        }
    }

    pub fn mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    pub fn install_tree(&mut self, root: &Component) -> Result<()> {
        let mut visited = Visited::default();
        let key = component_key(root.channel(), root.name());
        self.install_node(root, &key, "", true, &mut visited)
    }

    pub fn into_report(self) -> InstallReport {
        self.report
    }

    fn install_node(
        &mut self,
        component: &Component,
        key: &str,
        parent: &str,
        with_dependencies: bool,
        visited: &mut Visited,
    ) -> Result<()> {
        visited.enter(key, parent);

        if with_dependencies {
            for dependency in component.dependencies()? {
                if !is_selected(&dependency, self.options) || !dependency.is_package() {
                    continue;
                }
                let dep_key = dependency.key();
                if self.installed.contains(&dep_key) {
                    continue;
                }
                match visited.state(&dep_key) {
                    Some((Visit::InProgress, _)) => {
                        tracing::debug!(component = %dep_key, "dependency cycle, skipping");
                        continue;
                    }
                    Some((Visit::Done, _)) => continue,
                    None => {}
                }

                match self.resolver.resolve_dependency(&dependency, self.options)? {
                    Some(resolved) => {
                        let descend = !skips_dependencies(&dependency, self.options);
                        self.install_node(&resolved, &dep_key, key, descend, visited)?;
                    }
                    None if dependency.required => {
                        return Err(RepoError::ResolutionFailed {
                            message: format!(
                                "Failed to resolve required dependency {} of {}",
                                dep_key, key
                            ),
                        });
                    }
                    None => {
                        let warning = format!("Skipping optional dependency {} (unresolved)", dep_key);
                        tracing::warn!("{}", warning);
                        self.report.warnings.push(warning);
                    }
                }
            }
        }

        self.install_one(component, key)?;
        visited.finish(key);
        Ok(())
    }

    fn install_one(&mut self, component: &Component, key: &str) -> Result<()> {
        if !self.installed.insert(key.to_string()) {
            return Ok(());
        }

        if self.pretend {
            self.say(format!("Would install {}", component.install_target()?));
            self.report.installed.push(key.to_string());
            return Ok(());
        }

        let target = match &self.mode {
            InstallMode::Direct => component.install_target()?,
            InstallMode::Export { cache } => {
                let cache = cache.clone();
                self.export(component, &cache)?
            }
        };

        self.backend.install(&target)?;
        self.say(format!("Installed {}", key));
        self.report.installed.push(key.to_string());
        Ok(())
    }

    /// Place `component` into `cache` and install the archive just placed
    fn export(&mut self, component: &Component, cache: &Path) -> Result<String> {
        let (path, placement) = component.place_archive(cache)?;
        self.say(format!("{}: {} ({})", component.name(), placement, path.display()));
        Component::archive(&path)?.install_target()
    }

    fn say(&mut self, message: String) {
        tracing::info!("{}", message);
        self.report.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Channels;
    use crate::testing::{CHANNEL, FakeChannel, metadata, write_component};
    use std::cell::RefCell;
    use tempfile::TempDir;
    use wharf_core::archive::create_archive;
    use wharf_core::dependency::{DependencyEntry, DependencyKind};
    use wharf_core::metadata::DESCRIPTOR_FILE;
    use wharf_core::{Descriptor, Stability};

    #[derive(Default)]
    struct RecordingBackend {
        targets: RefCell<Vec<String>>,
    }

    impl InstallBackend for RecordingBackend {
        fn install(&self, target: &str) -> Result<()> {
            self.targets.borrow_mut().push(target.to_string());
            Ok(())
        }
    }

    struct Fixture {
        temp: TempDir,
        channel: Rc<FakeChannel>,
        resolver: ComponentResolver,
        options: ResolutionOptions,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let channel = Rc::new(FakeChannel::new(CHANNEL));
        let mut channels = Channels::new();
        channels.insert(channel.clone());
        let options = ResolutionOptions {
            home_channel: CHANNEL.to_string(),
            checkout_root: Some(temp.path().join("checkouts")),
            ..Default::default()
        };
        Fixture {
            temp,
            channel,
            resolver: ComponentResolver::new(channels),
            options,
        }
    }

    impl Fixture {
        fn checkout(&self, name: &str, deps: &[(&str, bool)]) -> Component {
            let dir = write_component(&self.temp.path().join("checkouts"), name, "1.0.0", deps);
            Component::source(Descriptor::load(&dir).unwrap())
        }

        fn checkout_with(&self, name: &str, dependencies: &[Dependency]) -> Component {
            let dir = write_component(&self.temp.path().join("checkouts"), name, "1.0.0", &[]);
            let mut meta = metadata(name, "1.0.0", &[]);
            meta.dependencies = dependencies.iter().map(DependencyEntry::from).collect();
            std::fs::write(dir.join(DESCRIPTOR_FILE), meta.to_yaml().unwrap()).unwrap();
            Component::source(Descriptor::load(&dir).unwrap())
        }
    }

    fn non_package(kind: DependencyKind, name: &str) -> Dependency {
        Dependency {
            name: name.to_string(),
            channel: String::new(),
            required: true,
            kind,
            constraint: "*".to_string(),
        }
    }

    fn mixed_root(f: &Fixture) -> Component {
        f.checkout("A", &[]);
        f.checkout_with(
            "Root",
            &[
                non_package(DependencyKind::Runtime, "PHP"),
                non_package(DependencyKind::Extension, "json"),
                Dependency::package("pear.php.net", "PEAR"),
                Dependency::package(CHANNEL, "A"),
            ],
        )
    }

    #[test]
    fn test_cycle_is_marked_as_recursion() {
        let f = fixture();
        let a = f.checkout("A", &[("B", true)]);
        f.checkout("B", &[("A", true)]);

        let entries = GraphWalker::new(&f.resolver, &f.options).list(&a).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "B");
        assert!(matches!(entries[0].annotation, Annotation::Resolved { .. }));
        assert_eq!(entries[1].name, "A");
        assert_eq!(entries[1].depth, 2);
        assert_eq!(entries[1].annotation, Annotation::Recursion);
    }

    #[test]
    fn test_shared_dependency_is_listed_once() {
        let f = fixture();
        let root = f.checkout("Root", &[("A", true), ("B", true)]);
        f.checkout("A", &[("Shared", true)]);
        f.checkout("B", &[("Shared", true)]);
        f.checkout("Shared", &[]);

        let entries = GraphWalker::new(&f.resolver, &f.options).list(&root).unwrap();
        let shared: Vec<_> = entries.iter().filter(|e| e.name == "Shared").collect();
        assert_eq!(shared.len(), 2);
        assert!(matches!(shared[0].annotation, Annotation::Resolved { .. }));
        assert_eq!(
            shared[1].annotation,
            Annotation::AlreadyListed {
                parent: "pear.example.org/A".to_string()
            }
        );
    }

    #[test]
    fn test_optional_and_instructions() {
        let mut f = fixture();
        let root = f.checkout("Root", &[("Opt", false), ("Req", true)]);
        f.checkout("Opt", &[]);
        f.checkout("Req", &[]);

        let names = |f: &Fixture| -> Vec<String> {
            GraphWalker::new(&f.resolver, &f.options)
                .list(&root)
                .unwrap()
                .into_iter()
                .map(|e| e.name)
                .collect()
        };
        assert_eq!(names(&f), vec!["Req"]);

        f.options.include_optional = true;
        assert_eq!(names(&f), vec!["Opt", "Req"]);

        f.options.include_optional = false;
        f.options.instructions.push("Opt=include".parse().unwrap());
        f.options.instructions.push("Req=exclude".parse().unwrap());
        assert_eq!(names(&f), vec!["Opt"]);
    }

    #[test]
    fn test_listing_skips_runtime_and_installer_itself() {
        let f = fixture();
        let root = mixed_root(&f);

        let entries = GraphWalker::new(&f.resolver, &f.options).list(&root).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["json", "A"]);
        assert_eq!(entries[0].annotation, Annotation::External);
        assert!(matches!(entries[1].annotation, Annotation::Resolved { .. }));
    }

    #[test]
    fn test_install_only_touches_packages() {
        let f = fixture();
        let root = mixed_root(&f);
        let backend = RecordingBackend::default();

        let mut installer = Installer::new(&f.resolver, &f.options, &backend);
        installer.install_tree(&root).unwrap();
        let report = installer.into_report();

        assert_eq!(
            report.installed,
            vec!["pear.example.org/A", "pear.example.org/Root"]
        );
        assert_eq!(backend.targets.borrow().len(), 2);
        assert_eq!(f.channel.queries(), 0);
    }

    #[test]
    fn test_unresolved_is_advisory() {
        let mut f = fixture();
        f.options.allow_remote = false;
        let root = f.checkout("Root", &[("Missing", true)]);
        let entries = GraphWalker::new(&f.resolver, &f.options).list(&root).unwrap();
        assert_eq!(entries[0].annotation, Annotation::Unresolved { reason: None });
    }

    #[test]
    fn test_render_tree() {
        let f = fixture();
        let root = f.checkout("Root", &[("A", true), ("B", true)]);
        f.checkout("A", &[("C", true)]);
        f.checkout("B", &[]);
        f.checkout("C", &[]);
        let mut entries = GraphWalker::new(&f.resolver, &f.options).list(&root).unwrap();
        for entry in &mut entries {
            entry.annotation = Annotation::External;
        }

        insta::assert_snapshot!(render_tree("pear.example.org/Root", &entries), @r"
        pear.example.org/Root
        ├── pear.example.org/A [external]
        │   └── pear.example.org/C [external]
        └── pear.example.org/B [external]
        ");
    }

    #[test]
    fn test_install_order_and_pretend() {
        let f = fixture();
        let root = f.checkout("Root", &[("A", true)]);
        f.checkout("A", &[("B", true)]);
        f.checkout("B", &[("A", true)]);
        let backend = RecordingBackend::default();

        let mut installer = Installer::new(&f.resolver, &f.options, &backend).pretend(true);
        installer.install_tree(&root).unwrap();
        let report = installer.into_report();
        assert_eq!(
            report.installed,
            vec![
                "pear.example.org/B",
                "pear.example.org/A",
                "pear.example.org/Root"
            ]
        );
        assert!(report.messages[0].starts_with("Would install "));
        assert!(backend.targets.borrow().is_empty());
    }

    #[test]
    fn test_installed_set_spans_the_run() {
        let f = fixture();
        let first = f.checkout("First", &[("Shared", true)]);
        let second = f.checkout("Second", &[("Shared", true)]);
        f.checkout("Shared", &[]);
        let backend = RecordingBackend::default();

        let mut installer = Installer::new(&f.resolver, &f.options, &backend);
        installer.install_tree(&first).unwrap();
        installer.install_tree(&second).unwrap();
        assert_eq!(backend.targets.borrow().len(), 3);
    }

    #[test]
    fn test_missing_required_dependency_is_fatal() {
        let mut f = fixture();
        f.options.allow_remote = false;
        let root = f.checkout("Root", &[("Missing", true), ("Gone", false)]);
        let backend = RecordingBackend::default();

        let mut installer = Installer::new(&f.resolver, &f.options, &backend);
        let err = installer.install_tree(&root).unwrap_err();
        assert!(matches!(err, RepoError::ResolutionFailed { .. }));
        assert!(backend.targets.borrow().is_empty());
    }

    #[test]
    fn test_export_installs_from_cache() {
        let f = fixture();
        let root = f.checkout("Root", &[("Remote", true)]);
        f.channel.publish("Remote", Stability::Stable, "3.0.0", &[]);
        let cache = f.temp.path().join("cache");
        let backend = RecordingBackend::default();

        let mut installer = Installer::new(&f.resolver, &f.options, &backend)
            .mode(InstallMode::Export { cache: cache.clone() });
        installer.install_tree(&root).unwrap();
        let report = installer.into_report();

        let targets = backend.targets.borrow();
        assert_eq!(
            *targets,
            vec![
                cache.join("Remote-3.0.0.tgz").display().to_string(),
                cache.join("Root-1.0.0.tgz").display().to_string(),
            ]
        );
        assert!(report.messages.iter().any(|m| m.contains("downloaded from network")));
        assert!(report.messages.iter().any(|m| m.contains("built package from source")));
    }

    #[test]
    fn test_export_ignores_other_archives_in_cache() {
        let f = fixture();
        let root = f.checkout("Root", &[("Remote", true)]);
        f.channel.publish("Remote", Stability::Stable, "3.0.0", &[]);
        let cache = f.temp.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        let scratch = TempDir::new().unwrap();
        create_archive(
            scratch.path(),
            &metadata("Remote", "2.0.0", &[]),
            &cache.join("Remote-2.0.0.tgz"),
        )
        .unwrap();
        let backend = RecordingBackend::default();

        let mut installer = Installer::new(&f.resolver, &f.options, &backend)
            .mode(InstallMode::Export { cache: cache.clone() });
        installer.install_tree(&root).unwrap();

        assert_eq!(
            backend.targets.borrow()[0],
            cache.join("Remote-3.0.0.tgz").display().to_string()
        );
    }
}
