//! Batch migration orchestrator.
//!
//! Walks a repository map, makes each destination ready, and mirrors each
//! source repository into it. A failing entry is recorded and the batch moves
//! on; only configuration and map problems stop a run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::process::ProcessRunner;
use crate::progress::{MigrationPhase, MigrationProgress};
use crate::providers::VcsProvider;
use crate::registry::ProviderRegistry;
use crate::repo_map::load_repo_map;
use crate::transfer::{StepObserver, TransferExecutor, TransferStep};
use crate::types::{AuthMode, BatchResult, EntryReport, MigrationOutcome, RepoMapEntry};
use crate::workspace::ScratchSpace;

/// Drives a batch of repository migrations between two providers.
pub struct Migrator {
    source: Arc<dyn VcsProvider>,
    destination: Arc<dyn VcsProvider>,
    source_auth: AuthMode,
    dest_auth: AuthMode,
    executor: TransferExecutor,
    concurrency: usize,
    progress: Arc<MigrationProgress>,
    cancel: CancellationToken,
    scratch_parent: Option<PathBuf>,
    dest_locks: DestinationLocks,
}

impl Migrator {
    /// Create a migrator with PAT auth on both sides and one entry at a time.
    pub fn new(
        source: Arc<dyn VcsProvider>,
        destination: Arc<dyn VcsProvider>,
        executor: TransferExecutor,
    ) -> Self {
        Self {
            source,
            destination,
            source_auth: AuthMode::default(),
            dest_auth: AuthMode::default(),
            executor,
            concurrency: 1,
            progress: Arc::new(MigrationProgress::new()),
            cancel: CancellationToken::new(),
            scratch_parent: None,
            dest_locks: DestinationLocks::default(),
        }
    }

    /// Build a migrator from configuration.
    ///
    /// Fails when either provider is unsupported or rejects its options.
    pub fn from_config(
        config: &MigrationConfig,
        registry: &ProviderRegistry,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self> {
        let source = registry.resolve_kind(config.source.vcs, &config.source.config)?;
        let destination =
            registry.resolve_kind(config.destination.vcs, &config.destination.config)?;

        if config.source.pipeline {
            warn!("Pipeline migration requested; pipeline definitions are not rewritten");
        }

        let executor = TransferExecutor::new(runner)
            .with_git_binary(&config.migration.git_binary)
            .with_step_timeout(config.migration.step_timeout());

        Ok(Self::new(source, destination, executor)
            .with_auth(config.source.auth, config.destination.auth)
            .with_concurrency(config.migration.concurrency))
    }

    /// Set the auth mode for each side.
    pub fn with_auth(mut self, source: AuthMode, destination: AuthMode) -> Self {
        self.source_auth = source;
        self.dest_auth = destination;
        self
    }

    /// Set how many entries may be in flight at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Report progress through `progress`.
    pub fn with_progress(mut self, progress: MigrationProgress) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Stop starting new entries once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Create the scratch directory under `parent` instead of the system
    /// temp dir.
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }

    /// Token that cancels the batch.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Progress tracker.
    pub fn progress(&self) -> &MigrationProgress {
        &self.progress
    }

    /// Load the repository map named by `config` and migrate it.
    pub async fn run(&self, config: &MigrationConfig) -> Result<BatchResult> {
        self.progress.set_phase(MigrationPhase::Initializing);
        let entries = load_repo_map(&config.repos.map)?;
        self.migrate(entries).await
    }

    /// Migrate every entry, in order.
    ///
    /// Returns one report per entry. Per-entry failures never surface as an
    /// error; only the scratch directory allocation can fail the call.
    pub async fn migrate(&self, entries: Vec<RepoMapEntry>) -> Result<BatchResult> {
        let started_at = Utc::now();
        let total = entries.len();

        info!(
            repositories = total,
            source = %self.source.kind(),
            destination = %self.destination.kind(),
            concurrency = self.concurrency,
            "Starting migration"
        );
        self.progress.start_batch(total as u64);

        let scratch = match &self.scratch_parent {
            Some(parent) => ScratchSpace::acquire_in(parent)?,
            None => ScratchSpace::acquire()?,
        };

        let reports: Vec<EntryReport> = stream::iter(entries.into_iter().enumerate())
            .map(|(index, entry)| self.process_entry(index, entry, &scratch))
            .buffered(self.concurrency)
            .collect()
            .await;

        self.progress.set_phase(MigrationPhase::CleaningUp);
        if let Err(e) = scratch.release() {
            warn!(error = %e, "Scratch directory was not fully removed");
        }

        let result = BatchResult::new(reports, started_at, Utc::now());
        self.progress.set_phase(MigrationPhase::Complete);

        info!(
            repositories = total,
            succeeded = result.succeeded(),
            unsuccessful = result.unsuccessful(),
            overall_success = result.overall_success,
            "Migration finished"
        );
        Ok(result)
    }

    async fn process_entry(
        &self,
        index: usize,
        entry: RepoMapEntry,
        scratch: &ScratchSpace,
    ) -> EntryReport {
        let started = Instant::now();
        let outcome = self.entry_outcome(index, &entry, scratch).await;
        self.progress.entry_finished(&entry.to_string(), outcome.label());

        EntryReport {
            entry,
            outcome,
            duration: started.elapsed(),
        }
    }

    async fn entry_outcome(
        &self,
        index: usize,
        entry: &RepoMapEntry,
        scratch: &ScratchSpace,
    ) -> MigrationOutcome {
        if self.cancel.is_cancelled() {
            info!(index, %entry, "Batch cancelled, entry not started");
            return MigrationOutcome::Cancelled;
        }

        let missing = entry.missing_fields();
        if !missing.is_empty() {
            warn!(index, missing = ?missing, "Skipping invalid map entry");
            return MigrationOutcome::SkippedInvalid(format!(
                "missing required fields: {}",
                missing.join(", ")
            ));
        }

        info!(
            src_repo = %entry.src_repo,
            src_project = %entry.src_project,
            dest_repo = %entry.dest_repo,
            dest_project = %entry.dest_project,
            "Migrating repository"
        );

        let _guard = self
            .dest_locks
            .acquire(&entry.dest_repo, &entry.dest_project)
            .await;

        let item = entry.to_string();
        self.progress.entry_phase(&item, MigrationPhase::CreatingRepository);
        if let Err(e) = self.ensure_destination(entry).await {
            warn!(
                dest_repo = %entry.dest_repo,
                dest_project = %entry.dest_project,
                error = %e,
                "Destination repository unavailable"
            );
            return MigrationOutcome::Failed(format!("create-failed: {e}"));
        }

        match self.transfer(index, entry, &item, scratch).await {
            Ok(()) => {
                info!(
                    src_repo = %entry.src_repo,
                    dest_repo = %entry.dest_repo,
                    dest_project = %entry.dest_project,
                    "Successfully migrated repository"
                );
                MigrationOutcome::Success
            }
            Err(e) => {
                warn!(
                    src_repo = %entry.src_repo,
                    src_project = %entry.src_project,
                    dest_repo = %entry.dest_repo,
                    dest_project = %entry.dest_project,
                    error = %e,
                    "Failed to migrate repository"
                );
                MigrationOutcome::Failed(e.to_string())
            }
        }
    }

    async fn ensure_destination(&self, entry: &RepoMapEntry) -> Result<()> {
        let ready = self
            .destination
            .create_repo(&entry.dest_repo, &entry.dest_project)
            .await?;
        if ready {
            Ok(())
        } else {
            Err(MigrationError::RepositoryCreation {
                repo: entry.dest_repo.clone(),
                project: entry.dest_project.clone(),
            })
        }
    }

    async fn transfer(
        &self,
        index: usize,
        entry: &RepoMapEntry,
        item: &str,
        scratch: &ScratchSpace,
    ) -> Result<()> {
        let source_url = self
            .source
            .clone_url(&entry.src_repo, self.source_auth, &entry.src_project)?;
        let dest_url = self
            .destination
            .clone_url(&entry.dest_repo, self.dest_auth, &entry.dest_project)?;

        let observer = EntryObserver {
            progress: self.progress.as_ref(),
            item,
        };
        self.executor
            .mirror(
                &source_url,
                &dest_url,
                &scratch.entry_dir(index, entry),
                &observer,
            )
            .await
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("source", &self.source.kind())
            .field("destination", &self.destination.kind())
            .field("source_auth", &self.source_auth)
            .field("dest_auth", &self.dest_auth)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Maps transfer steps onto progress phases for one entry.
struct EntryObserver<'a> {
    progress: &'a MigrationProgress,
    item: &'a str,
}

impl StepObserver for EntryObserver<'_> {
    fn step_started(&self, step: TransferStep) {
        let phase = match step {
            TransferStep::Clone => MigrationPhase::CloningRepository,
            TransferStep::SetRemote => MigrationPhase::RepointingRemote,
            TransferStep::Push => MigrationPhase::PushingRepository,
        };
        self.progress.entry_phase(self.item, phase);
    }
}

/// One async lock per destination repository.
#[derive(Default)]
struct DestinationLocks {
    locks: parking_lot::Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl DestinationLocks {
    async fn acquire(&self, repo: &str, project: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry((repo.to_string(), project.to_string()))
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
