//! Release command - run release tasks against a component checkout

use chrono::NaiveDate;
use clap::Args;
use console::style;
use std::path::PathBuf;
use std::rc::Rc;

use wharf_core::{Descriptor, MetadataStore, ProcessRunner, Stability, SystemProcess};
use wharf_release::sequence::expand;
use wharf_release::{
    Collaborators, Pipeline, ReleaseOptions, SendmailMailer, Sequences, SystemGit, TaskRegistry,
};
use wharf_repo::WharfConfig;

use super::http_client;
use crate::display::{self, IssueReport, MessageRenderer};
use crate::error::{CliError, Result};

/// Sequence run when neither tasks nor `--sequence` are given
pub const DEFAULT_SEQUENCE: &str = "release:default";

#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Tasks to run, in any order
    pub tasks: Vec<String>,

    /// Component checkout
    #[arg(short = 'C', long, default_value = ".")]
    pub component: PathBuf,

    /// Named task sequence from the configuration
    #[arg(short, long)]
    pub sequence: Option<String>,

    /// Drop tasks that fail validation instead of aborting
    #[arg(long)]
    pub skip_invalid: bool,

    /// Release date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Version opened by `nextversion`
    #[arg(long)]
    pub next_version: Option<String>,

    /// API version opened by `nextversion`
    #[arg(long)]
    pub next_api: Option<String>,

    #[arg(long)]
    pub next_stability: Option<Stability>,

    #[arg(long)]
    pub next_api_stability: Option<Stability>,

    /// Changelog note of the next version
    #[arg(long)]
    pub next_note: Option<String>,

    /// Branch releases must be made from
    #[arg(long)]
    pub branch: Option<String>,

    /// Git remote to push to
    #[arg(long)]
    pub remote: Option<String>,

    /// Directory receiving the release archive
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Command running the test suite
    #[arg(long)]
    pub test_command: Option<String>,

    /// Announcement sender
    #[arg(long)]
    pub from: Option<String>,

    /// Announcement recipients
    #[arg(long)]
    pub to: Vec<String>,

    /// List tasks and sequences and exit
    #[arg(long)]
    pub list: bool,
}

impl ReleaseArgs {
    /// Task names to run, expanded and in canonical order
    pub fn steps(&self, sequences: &Sequences) -> Result<Vec<String>> {
        let mut requested = match &self.sequence {
            Some(name) => sequences.get(name)?.to_vec(),
            None if self.tasks.is_empty() => sequences.get(DEFAULT_SEQUENCE)?.to_vec(),
            None => Vec::new(),
        };
        requested.extend(self.tasks.iter().cloned());
        Ok(expand(&requested))
    }

    pub fn options(&self, config: &WharfConfig, channel: &str, pretend: bool) -> ReleaseOptions {
        let date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let mut options = ReleaseOptions::new(date);
        options.pretend = pretend;
        options.skip_invalid = self.skip_invalid;
        options.next_version = self.next_version.clone();
        options.next_api = self.next_api.clone();
        options.next_stability = self.next_stability;
        options.next_api_stability = self.next_api_stability;
        options.next_note = self.next_note.clone();
        options.branch = self.branch.clone().or_else(|| config.branch.clone());
        options.remote = self.remote.clone().unwrap_or_else(|| config.remote.clone());
        options.archive_dir = self.archive_dir.clone();
        options.test_command = self
            .test_command
            .clone()
            .or_else(|| config.test_command.clone());
        options.announce_from = self.from.clone().or_else(|| config.announce.from.clone());
        options.announce_to = if self.to.is_empty() {
            config.announce.to.clone()
        } else {
            self.to.clone()
        };
        if let Ok(channel) = config.channel(channel) {
            options.tracker_url = channel.tracker_url.clone();
            options.upload_url = channel.upload_url.clone();
        }
        options
    }
}

fn list(registry: &TaskRegistry, sequences: &Sequences) -> Result<()> {
    println!("{}", style("Tasks").bold());
    for name in registry.names() {
        println!("  {}", name);
    }
    println!();
    println!("{}", style("Sequences").bold());
    for name in sequences.names() {
        println!("  {}: {}", name, sequences.expand(name)?.join(", "));
    }
    Ok(())
}

pub fn run(args: &ReleaseArgs, config: &WharfConfig, pretend: bool) -> Result<()> {
    let registry = TaskRegistry::with_defaults();
    let sequences = Sequences::from_config(&config.sequences);
    if args.list {
        return list(&registry, &sequences);
    }

    let mut descriptor = Descriptor::load(&args.component)?;
    let steps = args.steps(&sequences)?;
    tracing::debug!(?steps, "expanded release steps");
    let options = args.options(config, &descriptor.metadata().channel, pretend);

    let runner: Rc<dyn ProcessRunner> = Rc::new(SystemProcess::new(config.process_timeout));
    let collaborators = Collaborators {
        vcs: Rc::new(SystemGit::new(runner.clone())),
        runner: runner.clone(),
        http: http_client(config.http_timeout)?,
        mailer: Rc::new(SendmailMailer::new(runner)),
    };

    display::header(&format!(
        "Releasing {} {}{}: {}",
        descriptor.metadata().name,
        descriptor.metadata().version.release,
        if pretend { " (pretend)" } else { "" },
        steps.join(", ")
    ));

    let report = Pipeline::new(&registry, &collaborators).run(&steps, &mut descriptor, &options)?;

    MessageRenderer::new().render_all(&report.messages)?;

    let mut issues = IssueReport::new();
    for warning in &report.warnings {
        issues.add_warning(warning.as_str());
    }
    for issue in &report.post_issues {
        issues.add_error(issue.as_str());
    }
    if !issues.is_empty() {
        println!();
        issues.display();
    }

    if !report.post_issues.is_empty() {
        return Err(CliError::release_with_help(
            format!("{} task(s) reported issues after running", report.post_issues.len()),
            "Nothing was rolled back; inspect the component before retrying",
        ));
    }

    let done = report.executed.join(", ");
    if pretend {
        println!("{} Would run: {}", style("→").blue(), done);
    } else {
        display::success(&format!("Ran: {}", done));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use wharf_repo::Channel;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        release: ReleaseArgs,
    }

    fn parse(args: &[&str]) -> ReleaseArgs {
        Harness::parse_from(std::iter::once("release").chain(args.iter().copied())).release
    }

    #[test]
    fn test_steps() {
        let sequences = Sequences::default();
        assert_eq!(
            parse(&[]).steps(&sequences).unwrap(),
            ["timestamp", "changelog", "package", "commit", "tag", "nextversion"]
        );
        assert_eq!(
            parse(&["publish", "test"]).steps(&sequences).unwrap(),
            ["test", "package", "publish"]
        );
        assert_eq!(
            parse(&["--sequence", "release:default", "push"])
                .steps(&sequences)
                .unwrap()
                .last()
                .map(String::as_str),
            Some("push")
        );
        assert!(parse(&["--sequence", "nightly"]).steps(&sequences).is_err());
    }

    #[test]
    fn test_options_merge_config() {
        let mut config = WharfConfig::default();
        config.announce.from = Some("dev@example.org".to_string());
        config.announce.to = vec!["announce@example.org".to_string()];
        config.test_command = Some("phpunit".to_string());
        let mut channel = Channel::new("pear.example.org", "https://pear.example.org");
        channel.upload_url = Some("https://pear.example.org/upload".to_string());
        config.channels.push(channel);

        let args = parse(&["--date", "2024-05-01", "--to", "qa@example.org", "--remote", "upstream"]);
        let options = args.options(&config, "pear.example.org", true);

        assert!(options.pretend);
        assert_eq!(options.release_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(options.remote, "upstream");
        assert_eq!(options.announce_from.as_deref(), Some("dev@example.org"));
        assert_eq!(options.announce_to, ["qa@example.org"]);
        assert_eq!(options.test_command.as_deref(), Some("phpunit"));
        assert_eq!(
            options.upload_url.as_deref(),
            Some("https://pear.example.org/upload")
        );
        assert_eq!(options.tracker_url, None);
    }
}
