//! Abstraction over external command execution for testability.
//!
//! The dispatcher never spawns processes directly; it goes through the
//! [`CommandRunner`] trait so tests can record invocations and return canned
//! exit statuses.
//!
//! # Production Usage
//!
//! [`RealCommandRunner`] delegates to [`std::process::Command`], forwarding
//! the child's stdout and stderr to our stdout while keeping a copy.

use anyhow::{Context, Result, anyhow};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Mutex, PoisonError};

/// Trait for abstracting external command execution.
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, streaming its combined stdout and stderr
    /// to our stdout and collecting the same bytes into the returned
    /// [`CommandOutput`].
    ///
    /// Returns `Err` only when the command could not be started or its
    /// output could not be forwarded. A non-zero exit is reported through
    /// [`CommandOutput::status`].
    fn run_streamed(
        &self,
        program: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<CommandOutput>;
}

/// Options for command execution.
#[derive(Debug, Default, Clone)]
pub struct CommandOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Additional environment variables.
    pub env: Vec<(String, String)>,
}

impl CommandOptions {
    /// Create options with a working directory.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Default::default()
        }
    }
}

/// Result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Interleaved stdout and stderr, in the order chunks arrived.
    pub combined: Vec<u8>,
}

/// Production implementation that delegates to [`std::process::Command`].
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_streamed(
        &self,
        program: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &options.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to run '{program}'"))?;
        let stdout = child
            .stdout
            .take()
            .context("child stdout was not captured")?;
        let stderr = child
            .stderr
            .take()
            .context("child stderr was not captured")?;

        let buffer = Mutex::new(Vec::new());
        std::thread::scope(|scope| -> Result<()> {
            let buffer = &buffer;
            let out = scope.spawn(move || tee(stdout, buffer));
            let err = scope.spawn(move || tee(stderr, buffer));
            out.join()
                .map_err(|_| anyhow!("stdout forwarding thread panicked"))?
                .with_context(|| format!("Failed to forward output of '{program}'"))?;
            err.join()
                .map_err(|_| anyhow!("stderr forwarding thread panicked"))?
                .with_context(|| format!("Failed to forward output of '{program}'"))?;
            Ok(())
        })?;

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for '{program}'"))?;

        Ok(CommandOutput {
            status,
            combined: buffer.into_inner().unwrap_or_else(PoisonError::into_inner),
        })
    }
}

/// Copy `reader` to our stdout and append every chunk to `buffer`.
fn tee(mut reader: impl Read, buffer: &Mutex<Vec<u8>>) -> io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut stdout = io::stdout().lock();
        stdout.write_all(&chunk[..n])?;
        stdout.flush()?;
        drop(stdout);

        buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_options_default() {
        let opts = CommandOptions::default();
        assert!(opts.cwd.is_none());
        assert!(opts.env.is_empty());
    }

    #[test]
    fn test_command_options_with_cwd() {
        let opts = CommandOptions::with_cwd("/tmp");
        assert_eq!(opts.cwd.as_ref().unwrap().to_str().unwrap(), "/tmp");
        assert!(opts.env.is_empty());
    }

    #[test]
    fn test_real_runner_captures_stdout_and_stderr() {
        let output = RealCommandRunner
            .run_streamed(
                "sh",
                &["-c", "echo out; echo err >&2"],
                &CommandOptions::default(),
            )
            .unwrap();
        assert!(output.status.success());
        let combined = String::from_utf8_lossy(&output.combined);
        assert!(combined.contains("out\n"));
        assert!(combined.contains("err\n"));
    }

    #[test]
    fn test_real_runner_reports_failure_status() {
        let output = RealCommandRunner
            .run_streamed("sh", &["-c", "exit 3"], &CommandOptions::default())
            .unwrap();
        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_real_runner_missing_program() {
        let err = RealCommandRunner
            .run_streamed(
                "uos-app-definitely-not-a-program",
                &[],
                &CommandOptions::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("uos-app-definitely-not-a-program"));
    }

    #[test]
    fn test_real_runner_with_cwd_and_env() {
        let mut opts = CommandOptions::with_cwd("/");
        opts.env.push(("UOS_APP_TEST".into(), "value".into()));
        let output = RealCommandRunner
            .run_streamed("sh", &["-c", "pwd; echo $UOS_APP_TEST"], &opts)
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.combined), "/\nvalue\n");
    }
}
