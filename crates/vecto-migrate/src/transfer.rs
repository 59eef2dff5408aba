//! Mirror transfer of a single repository.
//!
//! A transfer is three git invocations run in order: mirror-clone from the
//! source, repoint `origin` at the destination, mirror-push. The first step
//! that fails ends the transfer; nothing is retried or rolled back and the
//! local clone is left for the batch scratch space to remove.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{MigrationError, Result};
use crate::process::{CommandSpec, ProcessRunner, RunError};

/// Default per-step timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Steps of a mirror transfer, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStep {
    /// `git clone --mirror`.
    Clone,
    /// `git remote set-url origin`.
    SetRemote,
    /// `git push --mirror`.
    Push,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => write!(f, "mirror-clone"),
            Self::SetRemote => write!(f, "remote set-url"),
            Self::Push => write!(f, "mirror-push"),
        }
    }
}

/// Observer for step boundaries, used for progress reporting.
pub trait StepObserver: Send + Sync {
    /// Called right before `step` starts.
    fn step_started(&self, step: TransferStep);
}

impl StepObserver for () {
    fn step_started(&self, _step: TransferStep) {}
}

/// Runs the clone, repoint and push sequence.
#[derive(Clone)]
pub struct TransferExecutor {
    runner: Arc<dyn ProcessRunner>,
    git: String,
    step_timeout: Duration,
}

impl TransferExecutor {
    /// Create an executor that invokes `git` from `PATH`.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            git: "git".to_string(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Use a specific git executable.
    pub fn with_git_binary(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// Set the timeout applied to each step.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Timeout applied to each step.
    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Mirror `source_url` into `scratch_path` and push every ref to
    /// `dest_url`.
    pub async fn mirror(
        &self,
        source_url: &str,
        dest_url: &str,
        scratch_path: &Path,
        observer: &dyn StepObserver,
    ) -> Result<()> {
        let redactor = Redactor::new([source_url, dest_url]);
        let local = scratch_path.to_string_lossy().into_owned();

        info!(
            source = %redact_url(source_url),
            destination = %redact_url(dest_url),
            path = %local,
            "Starting mirror transfer"
        );

        let clone = CommandSpec::new(&self.git, self.step_timeout)
            .arg("clone")
            .arg("--mirror")
            .arg(source_url)
            .arg(&local);
        self.run_step(TransferStep::Clone, &clone, &redactor, observer)
            .await?;

        let set_remote = CommandSpec::new(&self.git, self.step_timeout)
            .arg("-C")
            .arg(&local)
            .arg("remote")
            .arg("set-url")
            .arg("origin")
            .arg(dest_url);
        self.run_step(TransferStep::SetRemote, &set_remote, &redactor, observer)
            .await?;

        let push = CommandSpec::new(&self.git, self.step_timeout)
            .arg("-C")
            .arg(&local)
            .arg("push")
            .arg("--mirror");
        self.run_step(TransferStep::Push, &push, &redactor, observer)
            .await?;

        info!(destination = %redact_url(dest_url), "Mirror transfer complete");
        Ok(())
    }

    async fn run_step(
        &self,
        step: TransferStep,
        spec: &CommandSpec,
        redactor: &Redactor,
        observer: &dyn StepObserver,
    ) -> Result<()> {
        observer.step_started(step);
        debug!(%step, "Executing git step");

        let output = match self.runner.run(spec).await {
            Ok(output) => output,
            Err(RunError::TimedOut) => {
                return Err(MigrationError::StepTimedOut {
                    step,
                    timeout: spec.timeout,
                })
            }
            Err(RunError::Failed(e)) => return Err(e),
        };

        if !output.success() {
            return Err(MigrationError::TransferFailed {
                step,
                exit_code: output.exit_code,
                stdout: redactor.redact(&output.stdout),
                stderr: redactor.redact(&output.stderr),
            });
        }

        Ok(())
    }
}

/// Replace the credential part of an HTTP(S) remote URL with `***`.
///
/// SSH remotes and anything that does not parse as a URL are returned as is;
/// they never carry a secret.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if has_credentials(&url) => {
            // set_username/set_password only fail for cannot-be-a-base URLs,
            // which never carry credentials.
            let _ = url.set_password(None);
            let _ = url.set_username("***");
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

fn has_credentials(url: &Url) -> bool {
    !url.username().is_empty() || url.password().is_some()
}

/// Strips credentials of known remote URLs from arbitrary text, such as git
/// stderr that echoes the remote.
struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    fn new<'a>(urls: impl IntoIterator<Item = &'a str>) -> Self {
        let secrets = urls
            .into_iter()
            .filter_map(|raw| Url::parse(raw).ok())
            .filter(has_credentials)
            .flat_map(|url| {
                let mut parts = vec![url.username().to_string()];
                parts.extend(url.password().map(str::to_string));
                parts
            })
            .filter(|s| !s.is_empty())
            .collect();
        Self { secrets }
    }

    fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
    }
}
