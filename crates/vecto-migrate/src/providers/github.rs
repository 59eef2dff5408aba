//! GitHub provider.

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

/// Environment variable holding the GitHub token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Default host; override with the `host` option for GitHub Enterprise.
pub const DEFAULT_HOST: &str = "github.com";

static REPO_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("valid regex"));

/// GitHub organization or user account.
///
/// For GitHub the "project" of a map entry is the organization or user that
/// owns the repository.
#[derive(Debug)]
pub struct GitHubProvider {
    options: CommonOptions,
    credentials: Arc<dyn CredentialSource>,
}

impl GitHubProvider {
    /// Create a provider from the endpoint's options.
    pub fn new(options: &ProviderOptions, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        Ok(Self {
            options: parse_options(VcsKind::GitHub, options)?,
            credentials,
        })
    }

    fn host(&self) -> &str {
        self.options.host(DEFAULT_HOST)
    }

    fn is_valid_repo_name(name: &str) -> bool {
        REPO_NAME.is_match(name) && name != "." && name != ".."
    }
}

#[async_trait]
impl VcsProvider for GitHubProvider {
    fn kind(&self) -> VcsKind {
        VcsKind::GitHub
    }

    async fn get_inventory(&self, project: &str) -> Result<Vec<String>> {
        self.options.inventory(self.kind(), project)
    }

    fn clone_url(&self, repo: &str, auth: AuthMode, project: &str) -> Result<String> {
        check_url_components(repo, project)?;
        let owner = project;

        match auth {
            AuthMode::Ssh => Ok(format!("git@{}:{owner}/{repo}.git", self.host())),
            AuthMode::Pat => {
                let token = self
                    .credentials
                    .token(self.options.token_variable(TOKEN_ENV));
                Ok(https_remote(
                    token,
                    &format!("{}/{owner}/{repo}.git", self.host()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::options;
    use crate::providers::StaticCredentials;
    use serde_json::json;

    fn provider(creds: StaticCredentials) -> GitHubProvider {
        GitHubProvider::new(&ProviderOptions::new(), Arc::new(creds)).unwrap()
    }

    #[test]
    fn test_ssh_url() {
        let gh = provider(StaticCredentials::new());
        assert_eq!(
            gh.clone_url("r1", AuthMode::Ssh, "org1").unwrap(),
            "git@github.com:org1/r1.git"
        );
    }

    #[test]
    fn test_token_url_without_token() {
        let gh = provider(StaticCredentials::new());
        assert_eq!(
            gh.clone_url("r1", AuthMode::Pat, "org1").unwrap(),
            "https://github.com/org1/r1.git"
        );
    }

    #[test]
    fn test_token_url_with_token() {
        let gh = provider(StaticCredentials::new().with_token(TOKEN_ENV, "ghp_abc"));
        assert_eq!(
            gh.clone_url("r1", AuthMode::Pat, "org1").unwrap(),
            "https://ghp_abc@github.com/org1/r1.git"
        );
    }

    #[test]
    fn test_enterprise_host() {
        let gh = GitHubProvider::new(
            &options(json!({ "host": "github.example.com/" })),
            Arc::new(StaticCredentials::new()),
        )
        .unwrap();
        assert_eq!(
            gh.clone_url("r1", AuthMode::Ssh, "org1").unwrap(),
            "git@github.example.com:org1/r1.git"
        );
    }

    #[test]
    fn test_invalid_components() {
        let gh = provider(StaticCredentials::new());
        assert!(gh.clone_url("r 1", AuthMode::Ssh, "org1").is_err());
        assert!(gh.clone_url("r1", AuthMode::Ssh, "").is_err());
    }

    #[tokio::test]
    async fn test_create_repo_name_rules() {
        let gh = provider(StaticCredentials::new());
        assert!(gh.create_repo("service-api_v2.0", "org1").await.unwrap());
        assert!(!gh.create_repo("..", "org1").await.unwrap());
        assert!(!gh.create_repo("has space", "org1").await.unwrap());
    }
}
