//! External process execution
//!
//! Everything that shells out (installers, test suites, git, sendmail) goes
//! through [`ProcessRunner`] so it can be replaced in tests.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{CoreError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

pub trait ProcessRunner {
    /// Run `command` in `cwd`, feeding `input` to its stdin
    ///
    /// A non-zero exit code is not an error at this level.
    fn run_with_input(
        &self,
        command: &[String],
        cwd: &Path,
        input: Option<&str>,
    ) -> Result<ProcessOutput>;

    fn run(&self, command: &[String], cwd: &Path) -> Result<ProcessOutput> {
        self.run_with_input(command, cwd, None)
    }

    /// Run `command` and fail on a non-zero exit code
    fn check(&self, command: &[String], cwd: &Path) -> Result<ProcessOutput> {
        let output = self.run(command, cwd)?;
        if output.success() {
            Ok(output)
        } else {
            Err(CoreError::ProcessFailed {
                command: command.join(" "),
                code: output.code,
                output: output.combined().trim().to_string(),
            })
        }
    }
}

/// Runs commands on the host with a wall-clock timeout
#[derive(Debug, Clone)]
pub struct SystemProcess {
    timeout: Duration,
}

impl SystemProcess {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemProcess {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl ProcessRunner for SystemProcess {
    fn run_with_input(
        &self,
        command: &[String],
        cwd: &Path,
        input: Option<&str>,
    ) -> Result<ProcessOutput> {
        let (program, args) = command.split_first().ok_or_else(|| CoreError::ProcessFailed {
            command: String::new(),
            code: -1,
            output: "empty command".to_string(),
        })?;
        let shown = command.join(" ");
        tracing::debug!(command = %shown, cwd = %cwd.display(), "spawning process");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain pipes on separate threads so a chatty child cannot block,
        // and feed stdin from its own thread for the same reason
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);
        let writer = match (input, child.stdin.take()) {
            (Some(input), Some(stdin)) => Some(spawn_writer(stdin, input.to_string())),
            _ => None,
        };

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(command = %shown, "process timed out");
                return Err(CoreError::ProcessTimeout {
                    command: shown,
                    seconds: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        if let Some(writer) = writer {
            join_worker(writer)?;
        }
        Ok(ProcessOutput {
            code: status.code().unwrap_or(-1),
            stdout: stdout.map(join_reader).transpose()?.unwrap_or_default(),
            stderr: stderr.map(join_reader).transpose()?.unwrap_or_default(),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    mut pipe: R,
) -> thread::JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn spawn_writer<W: Write + Send + 'static>(
    mut pipe: W,
    input: String,
) -> thread::JoinHandle<io::Result<()>> {
    thread::spawn(move || match pipe.write_all(input.as_bytes()) {
        // The child may exit without reading all of its input
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    })
}

fn join_worker<T>(handle: thread::JoinHandle<io::Result<T>>) -> Result<T> {
    let result = handle
        .join()
        .map_err(|_| io::Error::other("process pipe thread panicked"))?;
    Ok(result?)
}

fn join_reader(handle: thread::JoinHandle<io::Result<Vec<u8>>>) -> Result<String> {
    let buf = join_worker(handle)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Split a configured command line into arguments
///
/// Whitespace separates arguments except inside single or double quotes.
/// A backslash escapes the next character outside single quotes.
pub fn split_command(line: &str) -> Result<Vec<String>> {
    let invalid = |message: &str| CoreError::InvalidCommand {
        command: line.to_string(),
        message: message.to_string(),
    };

    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                let escaped = chars.next().ok_or_else(|| invalid("trailing backslash"))?;
                current.push(escaped);
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(invalid("unterminated quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_captures_output_and_code() {
        let temp = TempDir::new().unwrap();
        let runner = SystemProcess::default();
        let out = runner.run(&sh("echo hello; exit 3"), temp.path()).unwrap();
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout.trim(), "hello");
        assert!(!out.success());
    }

    #[test]
    fn test_check_fails_on_nonzero() {
        let temp = TempDir::new().unwrap();
        let runner = SystemProcess::default();
        let err = runner.check(&sh("echo broken >&2; exit 1"), temp.path()).unwrap_err();
        match err {
            CoreError::ProcessFailed { code, output, .. } => {
                assert_eq!(code, 1);
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stdin_is_forwarded() {
        let temp = TempDir::new().unwrap();
        let runner = SystemProcess::default();
        let out = runner
            .run_with_input(&sh("cat"), temp.path(), Some("piped text"))
            .unwrap();
        assert_eq!(out.stdout, "piped text");
    }

    #[test]
    fn test_timeout_kills_process() {
        let temp = TempDir::new().unwrap();
        let runner = SystemProcess::new(Duration::from_millis(200));
        let err = runner.run(&sh("sleep 5"), temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::ProcessTimeout { .. }));
    }

    #[test]
    fn test_large_stdin_does_not_block_on_full_stdout() {
        // Echoes its input back, so stdout fills while stdin is still being written
        let temp = TempDir::new().unwrap();
        let runner = SystemProcess::new(Duration::from_secs(30));
        let input = "x".repeat(1 << 20);
        let out = runner
            .run_with_input(&sh("cat"), temp.path(), Some(&input))
            .unwrap();
        assert_eq!(out.stdout.len(), input.len());
    }

    #[test]
    fn test_unread_stdin_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let runner = SystemProcess::default();
        let input = "y".repeat(1 << 20);
        let out = runner
            .run_with_input(&sh("exit 0"), temp.path(), Some(&input))
            .unwrap();
        assert!(out.success());
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("pear install  --force").unwrap(),
            vec!["pear", "install", "--force"]
        );
        assert!(split_command("   ").unwrap().is_empty());
    }

    #[test]
    fn test_split_command_keeps_quoted_arguments() {
        assert_eq!(
            split_command(r#"sh -c "make test" --label 'unit tests' a\ b """#).unwrap(),
            vec!["sh", "-c", "make test", "--label", "unit tests", "a b", ""]
        );
        assert_eq!(
            split_command(r#"echo "say \"hi\"" 'it\s'"#).unwrap(),
            vec!["echo", "say \"hi\"", "it\\s"]
        );
    }

    #[test]
    fn test_split_command_rejects_unbalanced_quotes() {
        for line in ["run 'oops", "run \"oops", "run oops\\"] {
            let err = split_command(line).unwrap_err();
            assert!(matches!(err, CoreError::InvalidCommand { .. }), "{line}");
        }
    }
}
