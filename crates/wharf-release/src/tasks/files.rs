use wharf_core::ChangelogEntry;
use wharf_core::changelog::CHANGES_FILE;
use wharf_core::version::{self, implied_stability, next_pear_style_version};

use crate::error::Result;
use crate::task::{Task, TaskContext};

/// Stamps the release date into the descriptor and the changelog
pub struct TimestampTask;

impl Task for TimestampTask {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        match context.load_changelog() {
            Ok(changelog) if changelog.get(context.version()).is_some() => Vec::new(),
            Ok(_) => vec![format!(
                "changelog.yml has no entry for version {}",
                context.version()
            )],
            Err(e) => vec![e.to_string()],
        }
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let date = context.options.release_date;
        let version = context.version().to_string();

        context.descriptor.metadata_mut().date = Some(date);
        context.save_descriptor()?;

        let mut changelog = context.load_changelog()?;
        changelog.timestamp(&version, date);
        let path = context.changelog_path();
        context.write_staged(&path, &changelog.render()?)?;

        context.say(format!("Timestamped {} {} with {}", context.name(), version, date));
        Ok(())
    }
}

/// Renders the plain-text `CHANGES` file from `changelog.yml`
pub struct ChangelogTask;

impl Task for ChangelogTask {
    fn name(&self) -> &'static str {
        "changelog"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        if context.changelog_path().exists() {
            Vec::new()
        } else {
            vec![format!(
                "{} has no changelog.yml",
                context.root().display()
            )]
        }
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let changes = context.load_changelog()?.render_changes();
        let path = context.root().join(CHANGES_FILE);
        context.write_staged(&path, &changes)?;
        context.say(format!("Updated {}", CHANGES_FILE));
        Ok(())
    }

    fn post_validate(&self, context: &TaskContext) -> Vec<String> {
        if context.pretend() || context.root().join(CHANGES_FILE).exists() {
            Vec::new()
        } else {
            vec![format!("{} was not written", CHANGES_FILE)]
        }
    }
}

/// Opens the next development cycle
pub struct NextVersionTask;

impl NextVersionTask {
    fn next_release(context: &TaskContext) -> Result<String> {
        Ok(match &context.options.next_version {
            Some(next) => version::validate(next)?,
            None => version::validate(&next_pear_style_version(context.version())?)?,
        })
    }
}

impl Task for NextVersionTask {
    fn name(&self) -> &'static str {
        "nextversion"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        let mut issues = Vec::new();
        match Self::next_release(context) {
            Ok(next) => {
                if let Some(stability) = context.options.next_stability
                    && let Err(e) = version::validate_release_stability(&next, stability)
                {
                    issues.push(e.to_string());
                }
            }
            Err(e) => issues.push(e.to_string()),
        }
        if let Some(api) = &context.options.next_api {
            match version::validate(api) {
                Ok(api) => {
                    if let Some(stability) = context.options.next_api_stability
                        && let Err(e) = version::validate_api_stability(&api, stability)
                    {
                        issues.push(e.to_string());
                    }
                }
                Err(e) => issues.push(format!("API {}", e)),
            }
        }
        issues
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let previous = context.version().to_string();
        let next = Self::next_release(context)?;
        let release_stability = match context.options.next_stability {
            Some(stability) => stability,
            None => implied_stability(&next)?,
        };
        let note = context.options.next_note.clone().unwrap_or_default();
        let options = context.options;

        {
            let metadata = context.descriptor.metadata_mut();
            metadata.version.release = next.clone();
            if let Some(api) = &options.next_api {
                metadata.version.api = version::validate(api)?;
            }
            metadata.stability.release = release_stability;
            if let Some(stability) = options.next_api_stability {
                metadata.stability.api = stability;
            }
            metadata.date = None;
            metadata.notes = (!note.is_empty()).then(|| note.clone());
        }
        context.save_descriptor()?;

        let mut changelog = context.load_changelog()?;
        changelog.add_entry(next.clone(), ChangelogEntry::from_metadata(context.metadata(), note));
        let path = context.changelog_path();
        context.write_staged(&path, &changelog.render()?)?;

        context.state.previous_version = Some(previous.clone());
        context.state.next_version = Some(next.clone());
        context.say(format!("Next version of {} is {} (was {})", context.name(), next, previous));

        let message = format!("Development mode for {} {}", context.name(), next);
        context.flush_commit(&message)
    }
}
