//! Default repository map generation.
//!
//! Produces a 1:1 map from the source inventory for a human to review and
//! edit before running a migration.

use tracing::{info, warn};

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::types::RepoMapEntry;

/// Repository name emitted when inventory discovery is disabled.
pub const PLACEHOLDER_REPO: &str = "example-source-repo";

/// Destination project used when nothing else is configured.
pub const FALLBACK_DEST_PROJECT: &str = "my-dest-project";

/// Destination project written into generated entries.
pub fn default_dest_project(config: &MigrationConfig) -> String {
    config
        .migration
        .default_project
        .clone()
        .or_else(|| {
            config
                .destination
                .config
                .get("default_project_for_map")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| FALLBACK_DEST_PROJECT.to_string())
}

/// Build a map for every repository in `scope_project` on the source.
///
/// With inventory disabled, a single placeholder entry is returned and no
/// provider is touched. An inventory failure yields an empty map; the error
/// is logged and not returned. Only an unresolvable source provider is an
/// error.
pub async fn generate_repo_map(
    config: &MigrationConfig,
    registry: &ProviderRegistry,
    scope_project: &str,
) -> Result<Vec<RepoMapEntry>> {
    let source = &config.source;

    let repos = if source.get_inventory {
        let provider = registry.resolve_kind(source.vcs, &source.config)?;
        match provider.get_inventory(scope_project).await {
            Ok(repos) => {
                info!(
                    provider = %source.vcs,
                    project = scope_project,
                    count = repos.len(),
                    "Discovered repositories"
                );
                repos
            }
            Err(e) => {
                warn!(
                    provider = %source.vcs,
                    project = scope_project,
                    error = %e,
                    "Failed to get inventory, generating empty map"
                );
                Vec::new()
            }
        }
    } else {
        info!("Inventory discovery disabled, generating template map");
        vec![PLACEHOLDER_REPO.to_string()]
    };

    let dest_project = default_dest_project(config);
    Ok(repos
        .into_iter()
        .map(|repo| RepoMapEntry::new(repo.clone(), scope_project, repo, dest_project.clone()))
        .collect())
}
