//! VCS provider abstraction.
//!
//! Each supported hosting platform implements [`VcsProvider`]: listing the
//! repositories of a scope, building clone/push URLs for an auth mode, and
//! making a destination repository ready for a push. Providers are selected
//! through [`crate::registry::ProviderRegistry`].

pub mod azure_devops;
pub mod bitbucket;
pub mod github;
pub mod gitlab;

pub use azure_devops::AzureDevOpsProvider;
pub use bitbucket::BitbucketProvider;
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{MigrationError, Result};
use crate::types::{AuthMode, VcsKind};

/// Raw provider-specific options from the `config` block of an endpoint.
pub type ProviderOptions = serde_json::Map<String, serde_json::Value>;

/// Capability set every hosting platform implements.
#[async_trait]
pub trait VcsProvider: Send + Sync + fmt::Debug {
    /// The platform this provider talks to.
    fn kind(&self) -> VcsKind;

    /// Repository names visible under `project`.
    ///
    /// An unavailable listing is an error, never an empty list.
    async fn get_inventory(&self, project: &str) -> Result<Vec<String>>;

    /// Remote URL for `repo` in `project` using `auth`.
    ///
    /// Token auth reads the credential at call time. A missing token yields a
    /// URL without credentials so git can prompt or fail on its own.
    fn clone_url(&self, repo: &str, auth: AuthMode, project: &str) -> Result<String>;

    /// Make `repo` in `project` ready to receive a mirror push.
    ///
    /// Returns `Ok(false)` when the repository cannot be provided; errors are
    /// reserved for transport or API failures.
    async fn create_repo(&self, repo: &str, project: &str) -> Result<bool>;
}

/// Source of access tokens, looked up by variable name.
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Token stored under `variable`, if any.
    fn token(&self, variable: &str) -> Option<String>;
}

/// Reads tokens from the process environment. Empty values count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn token(&self, variable: &str) -> Option<String> {
        std::env::var(variable).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    tokens: HashMap<String, String>,
}

impl StaticCredentials {
    /// Create an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token.
    pub fn with_token(mut self, variable: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(variable.into(), token.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn token(&self, variable: &str) -> Option<String> {
        self.tokens.get(variable).filter(|v| !v.is_empty()).cloned()
    }
}

/// Options understood by every provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommonOptions {
    /// Overrides the provider's token variable.
    pub token_env: Option<String>,
    /// Known repositories per project scope.
    pub inventory: BTreeMap<String, Vec<String>>,
    /// Set to false when destinations must already exist.
    pub allow_create: Option<bool>,
    /// Hostname for self-hosted instances.
    pub host: Option<String>,
}

impl CommonOptions {
    pub(crate) fn token_variable<'a>(&'a self, default: &'a str) -> &'a str {
        self.token_env.as_deref().unwrap_or(default)
    }

    pub(crate) fn host<'a>(&'a self, default: &'a str) -> &'a str {
        self.host
            .as_deref()
            .map(|h| h.trim_end_matches('/'))
            .unwrap_or(default)
    }

    pub(crate) fn inventory(&self, kind: VcsKind, project: &str) -> Result<Vec<String>> {
        self.inventory
            .get(project)
            .cloned()
            .ok_or_else(|| MigrationError::InventoryUnavailable {
                provider: kind.to_string(),
                project: project.to_string(),
                message: "no inventory configured for this scope".to_string(),
            })
    }

    /// Shared answer for `create_repo` once the vendor name rule is known.
    pub(crate) fn provision(
        &self,
        kind: VcsKind,
        repo: &str,
        project: &str,
        name_ok: bool,
    ) -> bool {
        if !self.allow_create.unwrap_or(true) {
            warn!(%kind, repo, project, "Repository creation disabled for this endpoint");
            return false;
        }
        if !name_ok {
            warn!(%kind, repo, project, "Repository name rejected by provider naming rules");
            return false;
        }
        info!(%kind, repo, project, "Destination repository ready");
        true
    }
}

/// Deserialize the provider's option block into its typed form.
pub(crate) fn parse_options<T: DeserializeOwned>(
    kind: VcsKind,
    options: &ProviderOptions,
) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|e| {
        MigrationError::InvalidProviderOptions {
            provider: kind.to_string(),
            message: e.to_string(),
        }
    })
}

/// Reject names that cannot be placed in a remote URL.
pub(crate) fn check_url_components(repo: &str, project: &str) -> Result<()> {
    let invalid = |message: &str| MigrationError::InvalidRepository {
        repo: repo.to_string(),
        project: project.to_string(),
        message: message.to_string(),
    };

    if repo.is_empty() || project.is_empty() {
        return Err(invalid("repository and project must not be empty"));
    }
    if repo.contains('/') {
        return Err(invalid("repository name must not contain '/'"));
    }
    let forbidden = |c: char| c.is_whitespace() || matches!(c, '@' | ':' | '?' | '#' | '\\');
    if repo.chars().any(forbidden) || project.chars().any(forbidden) {
        return Err(invalid("names must not contain whitespace, '@', ':', '?', '#' or '\\'"));
    }
    Ok(())
}

/// `https://[credential@]host_and_path`, with no `@` when there is no
/// credential.
pub(crate) fn https_remote(credential: Option<String>, host_and_path: &str) -> String {
    match credential {
        Some(credential) => format!("https://{credential}@{host_and_path}"),
        None => format!("https://{host_and_path}"),
    }
}
