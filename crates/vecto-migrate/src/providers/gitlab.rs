//! GitLab provider.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    check_url_components, https_remote, parse_options, CommonOptions, CredentialSource,
    ProviderOptions, VcsProvider,
};
use crate::error::Result;
use crate::types::{AuthMode, VcsKind};

/// Environment variable holding the GitLab token.
pub const TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Default host; override with the `host` option for self-managed instances.
pub const DEFAULT_HOST: &str = "gitlab.com";

static PROJECT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,254}$").expect("valid regex"));

/// GitLab group (possibly nested, `group/subgroup`) or user namespace.
#[derive(Debug)]
pub struct GitLabProvider {
    options: CommonOptions,
    credentials: Arc<dyn CredentialSource>,
}

impl GitLabProvider {
    /// Create a provider from the endpoint's options.
    pub fn new(options: &ProviderOptions, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        Ok(Self {
            options: parse_options(VcsKind::GitLab, options)?,
            credentials,
        })
    }

    fn host(&self) -> &str {
        self.options.host(DEFAULT_HOST)
    }

    fn is_valid_repo_name(name: &str) -> bool {
        PROJECT_PATH.is_match(name) && !name.ends_with(".git") && !name.ends_with(".atom")
    }
}

#[async_trait]
impl VcsProvider for GitLabProvider {
    fn kind(&self) -> VcsKind {
        VcsKind::GitLab
    }

    async fn get_inventory(&self, project: &str) -> Result<Vec<String>> {
        self.options.inventory(self.kind(), project)
    }

    fn clone_url(&self, repo: &str, auth: AuthMode, project: &str) -> Result<String> {
        check_url_components(repo, project)?;
        let namespace = project.trim_matches('/');

        match auth {
            AuthMode::Ssh => Ok(format!("git@{}:{namespace}/{repo}.git", self.host())),
            AuthMode::Pat => {
                let credential = self
                    .credentials
                    .token(self.options.token_variable(TOKEN_ENV))
                    .map(|token| format!("oauth2:{token}"));
                Ok(https_remote(
                    credential,
                    &format!("{}/{namespace}/{repo}.git", self.host()),
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
