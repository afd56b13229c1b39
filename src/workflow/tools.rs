//! External program invocation for workflow tasks

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::debug;

/// An external program run from the project root
#[derive(Debug, Clone)]
pub struct Tool {
    program: String,
    cwd: PathBuf,
}

impl Tool {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cwd: cwd.into(),
        }
    }

    /// Runs the program with inherited stdio and fails on a non-zero exit
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        let mut command = self.command(args);
        let status = command
            .status()
            .with_context(|| format!("Failed to execute '{}'", self.program))?;

        if !status.success() {
            bail!(
                "'{}' failed with exit code {}",
                self.describe(args),
                status.code().unwrap_or(-1)
            );
        }

        Ok(())
    }

    /// Runs the program and returns its captured standard output
    pub fn output<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let mut command = self.command(args);
        command.stdout(Stdio::piped()).stderr(Stdio::inherit());

        let output = command
            .output()
            .with_context(|| format!("Failed to execute '{}'", self.program))?;

        if !output.status.success() {
            bail!(
                "'{}' failed with exit code {}",
                self.describe(args),
                output.status.code().unwrap_or(-1)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn command<S: AsRef<str>>(&self, args: &[S]) -> Command {
        let line = self.describe(args);
        debug!(command = %line, cwd = %self.cwd.display(), "spawning");

        let mut command = Command::new(&self.program);
        command
            .args(args.iter().map(AsRef::<str>::as_ref))
            .current_dir(&self.cwd);
        command
    }

    fn describe<S: AsRef<str>>(&self, args: &[S]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(AsRef::<str>::as_ref))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_success_and_failure() {
        let dir = TempDir::new().unwrap();

        assert!(Tool::new("true", dir.path()).run::<&str>(&[]).is_ok());

        let err = Tool::new("false", dir.path()).run::<&str>(&[]).unwrap_err();
        assert!(err.to_string().contains("'false' failed with exit code 1"));
    }

    #[test]
    fn missing_program() {
        let dir = TempDir::new().unwrap();
        let err = Tool::new("anvil-no-such-program", dir.path())
            .run(&["x"])
            .unwrap_err();
        assert!(err.to_string().contains("Failed to execute 'anvil-no-such-program'"));
    }

    #[test]
    fn output_is_captured() {
        let dir = TempDir::new().unwrap();
        let out = Tool::new("echo", dir.path()).output(&["status", "--porcelain"]).unwrap();
        assert_eq!(out.trim(), "status --porcelain");
    }

    #[test]
    fn runs_in_cwd() {
        let dir = TempDir::new().unwrap();
        let out = Tool::new("pwd", dir.path()).output::<&str>(&[]).unwrap();

        let expected = dir.path().canonicalize().unwrap();
        let actual = PathBuf::from(out.trim()).canonicalize().unwrap();
        assert_eq!(actual, expected);
    }
}
