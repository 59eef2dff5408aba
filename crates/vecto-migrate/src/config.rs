//! Migration configuration.
//!
//! Loaded from a YAML file of the form:
//!
//! ```yaml
//! src:
//!   vcs: AzureDevops
//!   auth: ssh
//!   get_inventory: true
//!   config:
//!     org_url: https://dev.azure.com/myorg
//! dest:
//!   vcs: GitHub
//!   auth: pat
//!   config: {}
//! repos:
//!   map: repos_map.json
//! migration:
//!   concurrency: 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MigrationError, Result};
use crate::providers::ProviderOptions;
use crate::types::{AuthMode, VcsKind};

/// Locations searched by [`MigrationConfig::discover`], relative to the
/// working directory.
pub const CONFIG_SEARCH_PATHS: [&str; 3] = ["config.yml", "config.yaml", "utils/config.yml"];

/// Complete configuration of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Where repositories come from.
    #[serde(rename = "src", alias = "source")]
    pub source: EndpointConfig,

    /// Where repositories go.
    #[serde(rename = "dest", alias = "destination")]
    pub destination: EndpointConfig,

    /// Repository map location.
    pub repos: ReposConfig,

    /// Run tuning.
    #[serde(default)]
    pub migration: RunOptions,
}

/// One side of the migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Hosting platform.
    pub vcs: VcsKind,

    /// Credential strategy.
    #[serde(default)]
    pub auth: AuthMode,

    /// Provider-specific options, validated by the provider itself.
    pub config: ProviderOptions,

    /// Request CI pipeline rewriting. Accepted but not performed.
    #[serde(default)]
    pub pipeline: bool,

    /// Whether the map generator may list repositories from this endpoint.
    #[serde(default)]
    pub get_inventory: bool,
}

/// Repository map section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReposConfig {
    /// Path to the repository map file.
    pub map: PathBuf,
}

/// Tuning for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Entries migrated at the same time.
    pub concurrency: usize,

    /// Timeout for each git step, in seconds.
    pub step_timeout_secs: u64,

    /// Git executable.
    pub git_binary: String,

    /// Destination project written into generated maps.
    pub default_project: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            step_timeout_secs: 3600,
            git_binary: "git".to_string(),
            default_project: None,
        }
    }
}

impl RunOptions {
    /// Step timeout as a [`Duration`].
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl MigrationConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MigrationError::ConfigNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&contents)?;

        info!(
            path = %path.display(),
            source = %config.source.vcs,
            destination = %config.destination.vcs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| MigrationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file in the working directory and load it.
    pub fn discover() -> Result<Self> {
        Self::discover_in(".")
    }

    /// Find a configuration file under `root` and load it.
    pub fn discover_in(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        for candidate in CONFIG_SEARCH_PATHS {
            let path = root.join(candidate);
            debug!(path = %path.display(), "Looking for configuration");
            if path.is_file() {
                return Self::load(path);
            }
        }
        Err(MigrationError::ConfigNotFound(format!(
            "none of {} found in {}",
            CONFIG_SEARCH_PATHS.join(", "),
            root.display()
        )))
    }

    /// Check invariants that parsing alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.repos.map.as_os_str().is_empty() {
            return Err(MigrationError::InvalidConfig(
                "repos.map must point to a repository map file".to_string(),
            ));
        }
        if self.migration.concurrency == 0 {
            return Err(MigrationError::InvalidConfig(
                "migration.concurrency must be at least 1".to_string(),
            ));
        }
        if self.migration.step_timeout_secs == 0 {
            return Err(MigrationError::InvalidConfig(
                "migration.step_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
