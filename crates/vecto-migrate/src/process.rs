//! Narrow capability for running external programs.
//!
//! Git is driven through [`ProcessRunner`] so the transfer pipeline can be
//! exercised in tests without any executable on `PATH`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MigrationError, Result};

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments, passed without a shell.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Upper bound on run time.
    pub timeout: Duration,
}

impl CommandSpec {
    /// Create a command with a timeout and no arguments.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Captured result of a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the program exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Outcome of [`ProcessRunner::run`] when the program could not finish.
#[derive(Debug)]
pub enum RunError {
    /// Program did not finish before the timeout and was killed.
    TimedOut,
    /// Program could not be started or awaited.
    Failed(MigrationError),
}

impl From<MigrationError> for RunError {
    fn from(e: MigrationError) -> Self {
        Self::Failed(e)
    }
}

/// Runs external programs.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command to completion and capture its output.
    ///
    /// A non-zero exit code is not an error at this layer.
    async fn run(&self, spec: &CommandSpec) -> std::result::Result<ProcessOutput, RunError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }

    async fn spawn_and_wait(spec: &CommandSpec) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must not leave git running.
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        // Own process group: a terminal interrupt reaches only this process,
        // and the cancellation token alone decides whether a push is cut short.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| MigrationError::ProcessSpawn {
            program: spec.program.clone(),
            message: e.to_string(),
        })?;

        let output = child.wait_with_output().await?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> std::result::Result<ProcessOutput, RunError> {
        debug!(program = %spec.program, args = spec.args.len(), "Spawning process");

        match tokio::time::timeout(spec.timeout, Self::spawn_and_wait(spec)).await {
            Ok(result) => result.map_err(RunError::Failed),
            Err(_) => Err(RunError::TimedOut),
        }
    }
}
