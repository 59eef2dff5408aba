//! Provider registry.
//!
//! An immutable mapping from [`VcsKind`] to a provider constructor, built once
//! at startup and passed by reference to whatever needs to resolve providers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{MigrationError, Result};
use crate::providers::{
    AzureDevOpsProvider, BitbucketProvider, CredentialSource, EnvCredentials, GitHubProvider,
    GitLabProvider, ProviderOptions, VcsProvider,
};
use crate::types::VcsKind;

/// Builds a provider from its option block and credential source.
pub type ProviderConstructor =
    fn(&ProviderOptions, Arc<dyn CredentialSource>) -> Result<Arc<dyn VcsProvider>>;

/// Resolves VCS kinds to provider instances.
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: BTreeMap<VcsKind, ProviderConstructor>,
    credentials: Arc<dyn CredentialSource>,
}

impl ProviderRegistry {
    /// Registry with every built-in provider, reading tokens from the
    /// process environment.
    pub fn new() -> Self {
        Self::with_defaults(Arc::new(EnvCredentials))
    }

    /// Registry with every built-in provider and the given credentials.
    pub fn with_defaults(credentials: Arc<dyn CredentialSource>) -> Self {
        Self::builder(credentials)
            .register(VcsKind::AzureDevOps, azure_devops)
            .register(VcsKind::GitHub, github)
            .register(VcsKind::GitLab, gitlab)
            .register(VcsKind::Bitbucket, bitbucket)
            .build()
    }

    /// Start an empty registry.
    pub fn builder(credentials: Arc<dyn CredentialSource>) -> ProviderRegistryBuilder {
        ProviderRegistryBuilder {
            constructors: BTreeMap::new(),
            credentials,
        }
    }

    /// Kinds with a registered provider.
    pub fn supported(&self) -> Vec<VcsKind> {
        self.constructors.keys().copied().collect()
    }

    /// Resolve a provider by name.
    ///
    /// Matching is case-insensitive and alias-tolerant, so `AzureDevOps`,
    /// `AzureDevops` and `azure-devops` resolve to the same provider.
    pub fn resolve(&self, name: &str, options: &ProviderOptions) -> Result<Arc<dyn VcsProvider>> {
        let kind = name
            .parse::<VcsKind>()
            .map_err(|_| self.unsupported(name))?;
        self.resolve_kind(kind, options)
    }

    /// Resolve a provider for an already parsed kind.
    pub fn resolve_kind(
        &self,
        kind: VcsKind,
        options: &ProviderOptions,
    ) -> Result<Arc<dyn VcsProvider>> {
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| self.unsupported(kind.as_str()))?;
        debug!(%kind, "Resolving provider");
        constructor(options, self.credentials.clone())
    }

    fn unsupported(&self, name: &str) -> MigrationError {
        MigrationError::UnsupportedProvider {
            name: name.to_string(),
            supported: self.supported().iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("supported", &self.supported())
            .finish_non_exhaustive()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn azure_devops(
    options: &ProviderOptions,
    credentials: Arc<dyn CredentialSource>,
) -> Result<Arc<dyn VcsProvider>> {
    Ok(Arc::new(AzureDevOpsProvider::new(options, credentials)?))
}

fn github(
    options: &ProviderOptions,
    credentials: Arc<dyn CredentialSource>,
) -> Result<Arc<dyn VcsProvider>> {
    Ok(Arc::new(GitHubProvider::new(options, credentials)?))
}

fn gitlab(
    options: &ProviderOptions,
    credentials: Arc<dyn CredentialSource>,
) -> Result<Arc<dyn VcsProvider>> {
    Ok(Arc::new(GitLabProvider::new(options, credentials)?))
}

fn bitbucket(
    options: &ProviderOptions,
    credentials: Arc<dyn CredentialSource>,
) -> Result<Arc<dyn VcsProvider>> {
    Ok(Arc::new(BitbucketProvider::new(options, credentials)?))
}

/// Collects constructors before freezing them into a [`ProviderRegistry`].
pub struct ProviderRegistryBuilder {
    constructors: BTreeMap<VcsKind, ProviderConstructor>,
    credentials: Arc<dyn CredentialSource>,
}

impl ProviderRegistryBuilder {
    /// Register (or replace) the constructor for `kind`.
    pub fn register(mut self, kind: VcsKind, constructor: ProviderConstructor) -> Self {
        self.constructors.insert(kind, constructor);
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            constructors: self.constructors,
            credentials: self.credentials,
        }
    }
}
