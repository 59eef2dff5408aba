//! Common types for migration operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MigrationError;

/// Supported hosting platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VcsKind {
    /// Azure DevOps Services.
    AzureDevOps,
    /// GitHub (cloud or Enterprise host).
    GitHub,
    /// GitLab (cloud or self-managed host).
    GitLab,
    /// Bitbucket Cloud.
    Bitbucket,
    /// Subversion.
    Svn,
}

impl VcsKind {
    /// Every kind the configuration accepts, registered or not.
    pub const ALL: [VcsKind; 5] = [
        Self::AzureDevOps,
        Self::GitHub,
        Self::GitLab,
        Self::Bitbucket,
        Self::Svn,
    ];

    /// Canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AzureDevOps => "AzureDevOps",
            Self::GitHub => "GitHub",
            Self::GitLab => "GitLab",
            Self::Bitbucket => "Bitbucket",
            Self::Svn => "SVN",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsKind {
    type Err = MigrationError;

    /// Case-insensitive; `-`, `_` and spaces are ignored so that vendor
    /// spellings like `AzureDevops`, `azure-devops` and `Github` all match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "azuredevops" | "azure" | "ado" => Ok(Self::AzureDevOps),
            "github" | "gh" => Ok(Self::GitHub),
            "gitlab" | "gl" => Ok(Self::GitLab),
            "bitbucket" | "bb" => Ok(Self::Bitbucket),
            "svn" | "subversion" => Ok(Self::Svn),
            _ => Err(MigrationError::UnsupportedProvider {
                name: s.to_string(),
                supported: Self::ALL.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

impl TryFrom<String> for VcsKind {
    type Error = MigrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VcsKind> for String {
    fn from(kind: VcsKind) -> Self {
        kind.to_string()
    }
}

/// Credential strategy used for a clone or push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthMode {
    /// Key-based; URLs carry no secret.
    Ssh,
    /// Personal access token read from the environment.
    #[default]
    Pat,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => write!(f, "ssh"),
            Self::Pat => write!(f, "pat"),
        }
    }
}

impl FromStr for AuthMode {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "pat" | "token" => Ok(Self::Pat),
            other => Err(MigrationError::InvalidConfig(format!(
                "unknown auth mode '{other}', expected 'ssh' or 'pat'"
            ))),
        }
    }
}

impl TryFrom<String> for AuthMode {
    type Error = MigrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AuthMode> for String {
    fn from(mode: AuthMode) -> Self {
        mode.to_string()
    }
}

/// One migration unit from the repository map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoMapEntry {
    /// Source repository name.
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub src_repo: String,

    /// Source project, organization, group or workspace.
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub src_project: String,

    /// Destination repository name.
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub dest_repo: String,

    /// Destination project, organization, group or workspace.
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub dest_project: String,
}

impl RepoMapEntry {
    /// Create a new map entry.
    pub fn new(
        src_repo: impl Into<String>,
        src_project: impl Into<String>,
        dest_repo: impl Into<String>,
        dest_project: impl Into<String>,
    ) -> Self {
        Self {
            src_repo: src_repo.into(),
            src_project: src_project.into(),
            dest_repo: dest_repo.into(),
            dest_project: dest_project.into(),
        }
    }

    /// Names of the required fields that are empty or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("src_repo", &self.src_repo),
            ("src_project", &self.src_project),
            ("dest_repo", &self.dest_repo),
            ("dest_project", &self.dest_project),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Whether all four fields are present.
    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

impl fmt::Display for RepoMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.src_project, self.src_repo, self.dest_project, self.dest_repo
        )
    }
}

/// Final state of one repository map entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Repository mirrored to the destination.
    Success,
    /// Entry was rejected before any provider or filesystem access.
    SkippedInvalid(String),
    /// Entry failed somewhere in its pipeline.
    Failed(String),
    /// Entry was never started because the batch was cancelled.
    Cancelled,
}

impl MigrationOutcome {
    /// Whether the entry succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Short label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::SkippedInvalid(_) => "SKIPPED",
            Self::Failed(_) => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Reason attached to a non-successful outcome.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::SkippedInvalid(reason) | Self::Failed(reason) => Some(reason),
            Self::Success | Self::Cancelled => None,
        }
    }
}

/// Outcome of one entry together with the entry it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReport {
    /// The map entry as given.
    pub entry: RepoMapEntry,

    /// Final outcome.
    pub outcome: MigrationOutcome,

    /// Wall-clock time spent on the entry.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

/// Aggregate result of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// True iff every entry succeeded. An empty batch is successful.
    pub overall_success: bool,

    /// One report per input entry, in input order.
    pub entries: Vec<EntryReport>,

    /// Start time of the run.
    pub started_at: DateTime<Utc>,

    /// End time of the run.
    pub completed_at: DateTime<Utc>,
}

impl BatchResult {
    /// Build a result from ordered entry reports.
    pub fn new(
        entries: Vec<EntryReport>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let overall_success = entries.iter().all(|e| e.outcome.is_success());
        Self {
            overall_success,
            entries,
            started_at,
            completed_at,
        }
    }

    /// Outcomes in input order.
    pub fn outcomes(&self) -> impl Iterator<Item = &MigrationOutcome> {
        self.entries.iter().map(|e| &e.outcome)
    }

    /// Number of successful entries.
    pub fn succeeded(&self) -> usize {
        self.outcomes().filter(|o| o.is_success()).count()
    }

    /// Number of entries that did not succeed.
    pub fn unsuccessful(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Duration of the whole run.
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }

    /// Print a summary of the batch.
    pub fn print_summary(&self) {
        println!("\n=== Migration Summary ===\n");

        for report in &self.entries {
            let marker = if report.outcome.is_success() { "✓" } else { "✗" };
            match report.outcome.reason() {
                Some(reason) => println!(
                    "{marker} [{}] {}: {reason}",
                    report.outcome.label(),
                    report.entry
                ),
                None => println!("{marker} [{}] {}", report.outcome.label(), report.entry),
            }
        }

        println!(
            "\nRepositories: {} total, {} succeeded, {} not migrated",
            self.entries.len(),
            self.succeeded(),
            self.unsuccessful()
        );
        println!("Completed in {} seconds", self.duration().num_seconds());

        let status = if self.overall_success {
            "SUCCESS"
        } else {
            "FAILED"
        };
        println!("\nOverall Status: {status}");
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Map fields written by hand or by other tools are not always strings.
/// Scalars keep their text; `null` and nested values read as empty so the
/// entry is rejected on its own instead of failing the whole map.
mod lenient_string {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        })
    }
}
