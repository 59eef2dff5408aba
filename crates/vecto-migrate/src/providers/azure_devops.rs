//! Azure DevOps provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    check_url_components, https_remote, parse_options, CommonOptions, CredentialSource,
    ProviderOptions, VcsProvider,
};
use crate::error::{MigrationError, Result};
use crate::types::{AuthMode, VcsKind};

/// Environment variable holding the Azure DevOps personal access token.
pub const TOKEN_ENV: &str = "ADO_PAT";

const SSH_HOST: &str = "ssh.dev.azure.com";

#[derive(Debug, Deserialize)]
struct AzureOptions {
    org_url: Option<String>,
    #[serde(flatten)]
    common: CommonOptions,
}

/// Azure DevOps Services organization.
///
/// In Azure DevOps a "project" is a project inside the configured
/// organization.
#[derive(Debug)]
pub struct AzureDevOpsProvider {
    /// Organization URL without scheme or trailing slash, e.g.
    /// `dev.azure.com/myorg`.
    org_host: String,
    organization: String,
    options: CommonOptions,
    credentials: Arc<dyn CredentialSource>,
}

impl AzureDevOpsProvider {
    /// Create a provider from the endpoint's options.
    ///
    /// Requires `org_url` pointing at `dev.azure.com`.
    pub fn new(options: &ProviderOptions, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let parsed: AzureOptions = parse_options(VcsKind::AzureDevOps, options)?;
        let invalid = |message: String| MigrationError::InvalidProviderOptions {
            provider: VcsKind::AzureDevOps.to_string(),
            message,
        };

        let org_url = parsed
            .org_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| invalid("missing required option 'org_url'".to_string()))?;
        if !org_url.contains("dev.azure.com") {
            return Err(invalid(format!("org_url '{org_url}' is not a dev.azure.com URL")));
        }

        let org_host = org_url
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        let organization = org_host
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && *segment != "dev.azure.com")
            .ok_or_else(|| invalid(format!("org_url '{org_url}' has no organization segment")))?
            .to_string();

        Ok(Self {
            org_host,
            organization,
            options: parsed.common,
            credentials,
        })
    }

    /// Organization name taken from the last segment of `org_url`.
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Azure DevOps repository naming rules.
    fn is_valid_repo_name(name: &str) -> bool {
        const FORBIDDEN: &[char] = &[
            '\\', '/', ':', '*', '?', '"', '<', '>', '|', ';', '#', '$', '{', '}', ',', '+', '=',
            '[', ']',
        ];
        !name.is_empty()
            && name.chars().count() <= 64
            && !name.starts_with('_')
            && !name.starts_with('.')
            && !name.ends_with('.')
            && !name.chars().any(|c| c.is_control() || FORBIDDEN.contains(&c))
    }
}

#[async_trait]
impl VcsProvider for AzureDevOpsProvider {
    fn kind(&self) -> VcsKind {
        VcsKind::AzureDevOps
    }

    async fn get_inventory(&self, project: &str) -> Result<Vec<String>> {
        self.options.inventory(self.kind(), project)
    }

    fn clone_url(&self, repo: &str, auth: AuthMode, project: &str) -> Result<String> {
        check_url_components(repo, project)?;

        match auth {
            AuthMode::Ssh => Ok(format!(
                "git@{SSH_HOST}:v3/{}/{project}/{repo}",
                self.organization
            )),
            AuthMode::Pat => {
                let token = self
                    .credentials
                    .token(self.options.token_variable(TOKEN_ENV));
                Ok(https_remote(
                    token,
                    &format!("{}/{project}/_git/{repo}", self.org_host),
                ))
            }
        }
    }

    async fn create_repo(&self, repo: &str, project: &str) -> Result<bool> {
        Ok(self
            .options
            .provision(self.kind(), repo, project, Self::is_valid_repo_name(repo)))
    }
}
