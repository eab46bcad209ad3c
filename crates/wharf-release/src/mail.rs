//! Release announcements

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use wharf_core::ProcessRunner;

use crate::error::{ReleaseError, Result};

/// A plain-text mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl fmt::Display for Mail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From: {}", self.from)?;
        writeln!(f, "To: {}", self.to.join(", "))?;
        writeln!(f, "Subject: {}", self.subject)?;
        writeln!(f, "Content-Type: text/plain; charset=utf-8")?;
        writeln!(f)?;
        write!(f, "{}", self.body)
    }
}

pub trait Mailer {
    fn send(&self, mail: &Mail) -> Result<()>;
}

/// Hands mails to the local `sendmail -t`
pub struct SendmailMailer {
    command: Vec<String>,
    runner: Rc<dyn ProcessRunner>,
}

impl SendmailMailer {
    pub fn new(runner: Rc<dyn ProcessRunner>) -> Self {
        Self {
            command: vec!["sendmail".to_string(), "-t".to_string()],
            runner,
        }
    }
}

impl Mailer for SendmailMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        let message = mail.to_string();
        let output =
            self.runner
                .run_with_input(&self.command, Path::new("."), Some(message.as_str()))?;
        if !output.success() {
            return Err(ReleaseError::Mail {
                message: output.combined().trim().to_string(),
            });
        }
        tracing::info!(to = %mail.to.join(", "), subject = %mail.subject, "announcement sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mail() {
        let mail = Mail {
            from: "dev@example.org".to_string(),
            to: vec!["announce@example.org".to_string(), "list@example.org".to_string()],
            subject: "[ANNOUNCE] Util 2.1.0 released".to_string(),
            body: "Hello\n".to_string(),
        };
        insta::assert_snapshot!(mail.to_string(), @r"
        From: dev@example.org
        To: announce@example.org, list@example.org
        Subject: [ANNOUNCE] Util 2.1.0 released
        Content-Type: text/plain; charset=utf-8

        Hello
        ");
    }
}
