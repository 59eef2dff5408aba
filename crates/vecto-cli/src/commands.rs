//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use vecto_migrate::{
    generate_repo_map, write_repo_map, ConsoleProgressReporter, MigrationConfig, MigrationError,
    MigrationProgress, Migrator, ProviderRegistry, TokioProcessRunner,
};

/// Command-line values that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Load configuration from `path`, or discover it, then apply overrides.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<MigrationConfig> {
    let mut config = match path {
        Some(path) => MigrationConfig::load(path),
        None => MigrationConfig::discover(),
    }
    .context("Invalid or missing configuration")?;

    if let Some(concurrency) = overrides.concurrency {
        config.migration.concurrency = concurrency;
    }
    if let Some(timeout) = overrides.timeout_secs {
        config.migration.step_timeout_secs = timeout;
    }
    config
        .validate()
        .context("Invalid command-line override")?;

    Ok(config)
}

/// Run the batch. Returns whether every entry succeeded.
pub async fn migrate(
    config_path: Option<&Path>,
    overrides: &Overrides,
    progress: bool,
) -> Result<bool> {
    let config = load_config(config_path, overrides)?;
    println!(
        "Loaded configuration for migration from {} to {}",
        config.source.vcs, config.destination.vcs
    );

    let registry = ProviderRegistry::new();
    let migrator = Migrator::from_config(&config, &registry, Arc::new(TokioProcessRunner::new()))
        .context("Failed to set up providers")?;

    let reporter = progress.then(ConsoleProgressReporter::new);
    let migrator = match &reporter {
        Some(reporter) => {
            migrator.with_progress(MigrationProgress::with_callback(reporter.callback()))
        }
        None => migrator,
    };

    let token = migrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, no further repositories will be started");
            token.cancel();
        }
    });

    let result = match migrator.run(&config).await {
        Ok(result) => result,
        Err(e) => {
            let context = abort_context(&e);
            return Err(anyhow::Error::new(e).context(context));
        }
    };

    if let Some(reporter) = reporter {
        reporter.finish("done");
    }
    result.print_summary();

    if result.overall_success {
        println!("\n{}", style("Migration process completed successfully.").green());
    } else {
        println!("\n{}", style("Migration process completed with errors.").red());
    }
    Ok(result.overall_success)
}

/// Headline for an error that ended a batch early.
fn abort_context(err: &MigrationError) -> &'static str {
    if err.is_batch_fatal() {
        "Migration aborted before any repository was processed"
    } else {
        "Migration aborted"
    }
}

/// Generate a repository map for `project` and write it to `output`, or to
/// the map path from the configuration.
pub async fn generate_map(
    config_path: Option<&Path>,
    overrides: &Overrides,
    project: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let registry = ProviderRegistry::new();

    let entries = generate_repo_map(&config, &registry, project)
        .await
        .context("Failed to generate repository map")?;

    let output = output.unwrap_or_else(|| config.repos.map.clone());
    write_repo_map(&output, &entries)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Repository mapping generated at: {} ({} entries)",
        output.display(),
        entries.len()
    );
    Ok(())
}

/// Load the configuration and construct both providers.
pub fn validate(config_path: Option<&Path>, overrides: &Overrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let registry = ProviderRegistry::new();

    for (side, endpoint) in [("source", &config.source), ("destination", &config.destination)] {
        registry
            .resolve_kind(endpoint.vcs, &endpoint.config)
            .with_context(|| format!("Invalid {side} endpoint"))?;
        println!(
            "{} {side}: {} (auth: {})",
            style("✓").green(),
            endpoint.vcs,
            endpoint.auth
        );
    }
    println!(
        "{} repository map: {}",
        style("✓").green(),
        config.repos.map.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
src:
  vcs: GitHub
  config:
    inventory:
      team-a: [api]
  get_inventory: true
dest:
  vcs: GitLab
  config: {}
repos:
  map: repos_map.json
"#;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.yml");
        std::fs::write(&path, CONFIG).unwrap();
        path
    }

    #[test]
    fn test_overrides_apply() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        let overrides = Overrides {
            concurrency: Some(8),
            timeout_secs: Some(30),
        };

        let config = load_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.migration.concurrency, 8);
        assert_eq!(config.migration.step_timeout_secs, 30);
    }

    #[test]
    fn test_zero_concurrency_override_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        let overrides = Overrides {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(load_config(Some(&path), &overrides).is_err());
    }

    #[test]
    fn test_validate_resolves_providers() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        validate(Some(&path), &Overrides::default()).unwrap();
    }

    #[test]
    fn test_abort_context_for_missing_map() {
        let fatal = MigrationError::MapNotFound(PathBuf::from("repos_map.json"));
        assert_eq!(
            abort_context(&fatal),
            "Migration aborted before any repository was processed"
        );

        let scoped = MigrationError::Workspace("disk full".to_string());
        assert_eq!(abort_context(&scoped), "Migration aborted");
    }

    #[tokio::test]
    async fn test_migrate_reports_missing_map() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);

        let err = migrate(Some(&path), &Overrides::default(), false)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Migration aborted before any repository was processed"
        );
        assert!(err
            .downcast_ref::<MigrationError>()
            .is_some_and(MigrationError::is_batch_fatal));
    }

    #[tokio::test]
    async fn test_generate_map_to_output() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        let output = dir.path().join("maps/team-a.json");

        generate_map(Some(&path), &Overrides::default(), "team-a", Some(output.clone()))
            .await
            .unwrap();

        let entries = vecto_migrate::load_repo_map(&output).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].src_repo, "api");
    }
}
