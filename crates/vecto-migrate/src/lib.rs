//! # Vecto Migration Engine
//!
//! This crate mirrors git repositories between hosting platforms: Azure
//! DevOps, GitHub, GitLab and Bitbucket.
//!
//! ## Features
//!
//! - **Provider abstraction**: URL construction, inventory and destination
//!   preparation per platform, selected through a [`ProviderRegistry`]
//! - **Mirror transfer**: full-fidelity `git clone --mirror` / `git push --mirror`
//!   with per-step timeouts and credential redaction
//! - **Batch orchestration**: per-entry failure isolation, bounded concurrency
//!   and cancellation
//! - **Map generation**: default repository maps from a source inventory
//! - **Progress Tracking**: phase and entry progress reporting
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vecto_migrate::{MigrationConfig, Migrator, ProviderRegistry, TokioProcessRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MigrationConfig::load("config.yml")?;
//!     let registry = ProviderRegistry::new();
//!
//!     let runner = Arc::new(TokioProcessRunner::new());
//!     let migrator = Migrator::from_config(&config, &registry, runner)?;
//!     let result = migrator.run(&config).await?;
//!
//!     result.print_summary();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod orchestrator;
pub mod process;
pub mod progress;
pub mod providers;
pub mod registry;
pub mod repo_map;
pub mod transfer;
pub mod types;
pub mod workspace;

// Re-export main types
pub use config::{EndpointConfig, MigrationConfig, ReposConfig, RunOptions};
pub use error::{MigrationError, Result};
pub use mapper::generate_repo_map;
pub use orchestrator::Migrator;
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, RunError, TokioProcessRunner};
pub use progress::{
    ConsoleProgressReporter, MigrationPhase, MigrationProgress, ProgressCallback,
};
pub use providers::{
    CredentialSource, EnvCredentials, ProviderOptions, StaticCredentials, VcsProvider,
};
pub use registry::ProviderRegistry;
pub use repo_map::{load_repo_map, write_repo_map};
pub use transfer::{redact_url, TransferExecutor, TransferStep};
pub use types::*;
pub use workspace::ScratchSpace;

/// Version of the migration engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
