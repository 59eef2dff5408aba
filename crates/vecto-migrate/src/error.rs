//! Error types for migration operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::transfer::TransferStep;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No configuration file could be located.
    #[error("Configuration not found: {0}")]
    ConfigNotFound(String),

    /// Configuration exists but is unreadable or invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Repository map file does not exist.
    #[error("Repository map not found: {}", .0.display())]
    MapNotFound(PathBuf),

    /// Repository map exists but cannot be read or parsed.
    #[error("Invalid repository map {}: {message}", path.display())]
    InvalidMap { path: PathBuf, message: String },

    /// No provider is registered for the requested VCS kind.
    #[error("Unsupported VCS: {name}. Supported: {}", supported.join(", "))]
    UnsupportedProvider { name: String, supported: Vec<String> },

    /// Provider-specific options failed validation.
    #[error("Invalid options for {provider}: {message}")]
    InvalidProviderOptions { provider: String, message: String },

    /// Inventory for the requested scope could not be listed.
    #[error("Inventory unavailable for '{project}' on {provider}: {message}")]
    InventoryUnavailable {
        provider: String,
        project: String,
        message: String,
    },

    /// Repository or project name cannot be used to build a remote URL.
    #[error("Invalid repository '{project}/{repo}': {message}")]
    InvalidRepository {
        repo: String,
        project: String,
        message: String,
    },

    /// Destination repository could not be made ready for a push.
    #[error("Failed to create destination repo '{repo}' in project '{project}'")]
    RepositoryCreation { repo: String, project: String },

    /// A git step exited unsuccessfully.
    #[error(
        "Git {step} failed with exit code {}: {}",
        exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()),
        stderr.trim()
    )]
    TransferFailed {
        step: TransferStep,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// A git step ran past its timeout and was killed.
    #[error("Git {step} timed out after {} seconds", timeout.as_secs())]
    StepTimedOut { step: TransferStep, timeout: Duration },

    /// External program could not be started.
    #[error("Failed to start '{program}': {message}")]
    ProcessSpawn { program: String, message: String },

    /// Scratch workspace could not be allocated or released.
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl MigrationError {
    /// Whether this error makes the whole batch meaningless.
    ///
    /// Everything else is scoped to a single repository map entry.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_)
                | Self::InvalidConfig(_)
                | Self::MapNotFound(_)
                | Self::InvalidMap { .. }
                | Self::UnsupportedProvider { .. }
                | Self::InvalidProviderOptions { .. }
        )
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
