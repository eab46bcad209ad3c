use std::path::PathBuf;

use serde::Serialize;
use wharf_core::archive::archive_name;
use wharf_core::version::ticket_description;

use crate::error::{ReleaseError, Result};
use crate::mail::Mail;
use crate::task::{Task, TaskContext};

/// Payload registering a version with the issue tracker
#[derive(Debug, Serialize)]
struct TrackerVersion<'a> {
    component: &'a str,
    version: &'a str,
    description: String,
}

/// Registers the release with the issue tracker
pub struct TrackerTask;

impl Task for TrackerTask {
    fn name(&self) -> &'static str {
        "tracker"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        let mut issues = Vec::new();
        if context.options.tracker_url.is_none() {
            issues.push("No tracker URL configured for this channel".to_string());
        }
        if let Err(e) = ticket_description(context.version()) {
            issues.push(e.to_string());
        }
        issues
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let url = context.options.tracker_url.clone().unwrap_or_default();
        let description = ticket_description(context.version())?.to_string();
        let payload = TrackerVersion {
            component: context.name(),
            version: context.version(),
            description: format!("{} {}", context.name(), description),
        };
        let body = serde_json::to_vec(&payload).map_err(|e| ReleaseError::TaskFailed {
            task: self.name().to_string(),
            message: e.to_string(),
        })?;

        if context.pretend() {
            let message = format!(
                "Would register \"{} {}\" at {}",
                context.name(),
                description,
                url
            );
            context.say(message);
            return Ok(());
        }

        context
            .collaborators
            .http
            .post(&url, "application/json", body)?;
        context.say(format!("Registered {} {} with the tracker", context.name(), description));
        Ok(())
    }
}

/// Mails the release announcement
pub struct AnnounceTask;

impl AnnounceTask {
    fn compose(context: &TaskContext) -> Result<Mail> {
        let metadata = context.metadata();
        let description = ticket_description(&metadata.version.release)?;

        let mut body = format!(
            "The {} team is pleased to announce the {} release of {}.\n",
            metadata.channel, description, metadata.name
        );
        if let Some(summary) = &metadata.summary {
            body.push_str(&format!("\n{}\n", summary));
        }
        let notes = context
            .load_changelog()?
            .get(&metadata.version.release)
            .map(|entry| entry.notes.trim().to_string())
            .unwrap_or_default();
        if !notes.is_empty() {
            body.push_str(&format!("\nChanges in this version:\n{}\n", notes));
        }

        Ok(Mail {
            from: context.options.announce_from.clone().unwrap_or_default(),
            to: context.options.announce_to.clone(),
            subject: format!(
                "[ANNOUNCE] {} {} released",
                metadata.name, metadata.version.release
            ),
            body,
        })
    }
}

impl Task for AnnounceTask {
    fn name(&self) -> &'static str {
        "announce"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        let mut issues = Vec::new();
        if context.options.announce_from.is_none() {
            issues.push("No announcement sender configured".to_string());
        }
        if context.options.announce_to.is_empty() {
            issues.push("No announcement recipients configured".to_string());
        }
        issues
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let mail = Self::compose(context)?;
        if context.pretend() {
            context.say(format!("Would send announcement:\n{}", mail));
            return Ok(());
        }
        context.collaborators.mailer.send(&mail)?;
        context.say(format!("Announced release to {}", mail.to.join(", ")));
        Ok(())
    }
}

/// Uploads the archive to the channel
pub struct PublishTask;

impl PublishTask {
    fn archive(context: &TaskContext) -> PathBuf {
        context.state.package.clone().unwrap_or_else(|| {
            let dir = context
                .options
                .archive_dir
                .clone()
                .unwrap_or_else(|| context.root());
            dir.join(archive_name(context.name(), context.version()))
        })
    }
}

impl Task for PublishTask {
    fn name(&self) -> &'static str {
        "publish"
    }

    fn pre_validate(&self, context: &TaskContext) -> Vec<String> {
        if context.options.upload_url.is_none() {
            vec!["No upload URL configured for this channel".to_string()]
        } else {
            Vec::new()
        }
    }

    fn run(&self, context: &mut TaskContext) -> Result<()> {
        let url = context.options.upload_url.clone().unwrap_or_default();
        let archive = Self::archive(context);

        if context.pretend() {
            context.say(format!("Would upload {} to {}", archive.display(), url));
            return Ok(());
        }

        let body = std::fs::read(&archive)?;
        context
            .collaborators
            .http
            .post(&url, "application/gzip", body)?;
        context.say(format!("Published {}", archive.display()));
        Ok(())
    }
}
