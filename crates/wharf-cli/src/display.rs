//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Issue lists (release warnings, post-run issues, unresolved dependencies)
//! - Task output, with unified diffs colored line by line

use console::style;
use std::io::{self, Write};

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

/// Issues collected by one action
#[derive(Debug, Default)]
pub struct IssueReport {
    pub issues: Vec<Issue>,
}

impl IssueReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// (errors, warnings)
    pub fn summary(&self) -> (usize, usize) {
        let errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        (errors, self.issues.len() - errors)
    }

    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        for issue in &self.issues {
            let icon = match issue.severity {
                Severity::Error => style("✗").red(),
                Severity::Warning => style("⚠").yellow(),
            };
            writeln!(writer, "  {} {}", icon, issue.message)?;
        }
        Ok(())
    }

    pub fn display(&self) {
        let _ = self.write_to(&mut io::stdout());
    }
}

/// Writes task output to the terminal
pub struct MessageRenderer {
    writer: Box<dyn Write>,
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRenderer {
    /// Renderer writing to stdout
    pub fn new() -> Self {
        Self {
            writer: Box::new(io::stdout()),
        }
    }

    /// Renderer writing to a custom writer
    #[cfg(test)]
    pub fn with_writer<W: Write + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Print one message, coloring diff lines
    pub fn render(&mut self, message: &str) -> io::Result<()> {
        if !message.starts_with("--- ") {
            return writeln!(self.writer, "{}", message);
        }
        for line in message.lines() {
            if line.starts_with("+++") || line.starts_with("---") {
                writeln!(self.writer, "{}", style(line).bold())?;
            } else if line.starts_with("@@") {
                writeln!(self.writer, "{}", style(line).cyan())?;
            } else if line.starts_with('+') {
                writeln!(self.writer, "{}", style(line).green())?;
            } else if line.starts_with('-') {
                writeln!(self.writer, "{}", style(line).red())?;
            } else {
                writeln!(self.writer, "{}", line)?;
            }
        }
        Ok(())
    }

    pub fn render_all(&mut self, messages: &[String]) -> io::Result<()> {
        for message in messages {
            self.render(message)?;
        }
        Ok(())
    }
}

/// `→ title`
pub fn header(title: &str) {
    println!("{} {}", style("→").blue(), style(title).bold());
}

/// `✓ message`
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Byte size in the largest fitting unit
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
