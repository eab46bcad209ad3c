//! Version control operations used by release tasks

use std::path::{Path, PathBuf};
use std::rc::Rc;

use wharf_core::ProcessRunner;

use crate::error::{ReleaseError, Result};

pub trait Vcs {
    fn current_branch(&self, dir: &Path) -> Result<String>;

    fn stage(&self, dir: &Path, paths: &[PathBuf]) -> Result<()>;

    fn commit(&self, dir: &Path, message: &str) -> Result<()>;

    /// Create an annotated tag
    fn tag(&self, dir: &Path, tag: &str, message: &str) -> Result<()>;

    /// Push `branch` and all tags to `remote`
    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<()>;
}

/// The `git` binary, driven through a [`ProcessRunner`]
pub struct SystemGit {
    runner: Rc<dyn ProcessRunner>,
}

impl SystemGit {
    pub fn new(runner: Rc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let mut command = vec!["git".to_string()];
        command.extend(args.iter().map(|a| a.to_string()));
        let output = self
            .runner
            .check(&command, dir)
            .map_err(|e| ReleaseError::Vcs {
                message: e.to_string(),
            })?;
        Ok(output.stdout)
    }
}

impl Vcs for SystemGit {
    fn current_branch(&self, dir: &Path) -> Result<String> {
        Ok(self
            .git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    fn stage(&self, dir: &Path, paths: &[PathBuf]) -> Result<()> {
        let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(dir, &args)?;
        Ok(())
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        self.git(dir, &["commit", "-m", message])?;
        Ok(())
    }

    fn tag(&self, dir: &Path, tag: &str, message: &str) -> Result<()> {
        self.git(dir, &["tag", "-a", "-m", message, tag])?;
        Ok(())
    }

    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        self.git(dir, &["push", remote, branch])?;
        self.git(dir, &["push", remote, "--tags"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use wharf_core::{CoreError, ProcessOutput};

    #[derive(Default)]
    struct ScriptedRunner {
        calls: RefCell<Vec<Vec<String>>>,
        fail: bool,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run_with_input(
            &self,
            command: &[String],
            _cwd: &Path,
            _input: Option<&str>,
        ) -> wharf_core::Result<ProcessOutput> {
            self.calls.borrow_mut().push(command.to_vec());
            if self.fail {
                return Err(CoreError::ProcessFailed {
                    command: command.join(" "),
                    code: 128,
                    output: "fatal: not a git repository".to_string(),
                });
            }
            Ok(ProcessOutput {
                code: 0,
                stdout: "main\n".to_string(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_git_commands() {
        let runner = Rc::new(ScriptedRunner::default());
        let git = SystemGit::new(runner.clone());
        let dir = Path::new("/c");

        assert_eq!(git.current_branch(dir).unwrap(), "main");
        git.stage(dir, &[PathBuf::from("/c/changelog.yml")]).unwrap();
        git.tag(dir, "Util-v2.1.0", "Released Util 2.1.0").unwrap();
        git.push(dir, "origin", "main").unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[1], vec!["git", "add", "--", "/c/changelog.yml"]);
        assert_eq!(
            calls[2],
            vec!["git", "tag", "-a", "-m", "Released Util 2.1.0", "Util-v2.1.0"]
        );
        assert_eq!(calls[4], vec!["git", "push", "origin", "--tags"]);
    }

    #[test]
    fn test_failures_become_vcs_errors() {
        let runner = Rc::new(ScriptedRunner {
            fail: true,
            ..Default::default()
        });
        let git = SystemGit::new(runner);
        let err = git.current_branch(Path::new("/c")).unwrap_err();
        assert!(matches!(err, ReleaseError::Vcs { .. }));
    }
}
