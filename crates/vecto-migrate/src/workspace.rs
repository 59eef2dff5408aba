//! Batch-scoped scratch directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{MigrationError, Result};
use crate::types::RepoMapEntry;

/// Prefix of every scratch directory name.
pub const SCRATCH_PREFIX: &str = "vecto-migration-";

/// Uniquely named directory owned by one orchestrator run.
///
/// Removed by [`ScratchSpace::release`], or on drop if the run never got
/// that far.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Allocate a scratch directory under the system temp dir.
    pub fn acquire() -> Result<Self> {
        Self::acquire_in(std::env::temp_dir())
    }

    /// Allocate a scratch directory under `parent`.
    pub fn acquire_in(parent: impl AsRef<Path>) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent.as_ref())
            .map_err(|e| {
                MigrationError::Workspace(format!(
                    "failed to create scratch directory in {}: {e}",
                    parent.as_ref().display()
                ))
            })?;
        info!(path = %dir.path().display(), "Created temporary working directory");
        Ok(Self { dir })
    }

    /// Root of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Per-entry clone location.
    ///
    /// Keyed by position, source project and source repo so entries that
    /// share a repository name never share a directory.
    pub fn entry_dir(&self, index: usize, entry: &RepoMapEntry) -> PathBuf {
        self.dir.path().join(format!(
            "{index:04}-{}-{}",
            sanitize(&entry.src_project),
            sanitize(&entry.src_repo)
        ))
    }

    /// Remove the directory and everything in it.
    pub fn release(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        debug!(path = %path.display(), "Cleaning up temporary directory");
        self.dir.close().map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary directory");
            MigrationError::Workspace(format!("failed to remove {}: {e}", path.display()))
        })
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::acquire_in(parent.path()).unwrap();
        let path = scratch.path().to_path_buf();

        assert!(path.is_dir());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));

        std::fs::create_dir_all(path.join("0000-p-r/objects")).unwrap();
        scratch.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchSpace::acquire_in(parent.path()).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_acquisitions_are_distinct() {
        let parent = tempfile::tempdir().unwrap();
        let a = ScratchSpace::acquire_in(parent.path()).unwrap();
        let b = ScratchSpace::acquire_in(parent.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_entry_dirs_do_not_collide() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::acquire_in(parent.path()).unwrap();

        let first = RepoMapEntry::new("api", "team-a", "api", "dest");
        let second = RepoMapEntry::new("api", "team-b", "api-b", "dest");

        let a = scratch.entry_dir(0, &first);
        let b = scratch.entry_dir(1, &second);
        assert_ne!(a, b);
        assert!(a.starts_with(scratch.path()));
        assert_eq!(a.file_name().unwrap(), "0000-team-a-api");
    }

    #[test]
    fn test_entry_dir_sanitizes_separators() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::acquire_in(parent.path()).unwrap();
        let entry = RepoMapEntry::new("../escape", "group/sub", "r", "p");

        let dir = scratch.entry_dir(3, &entry);
        assert_eq!(dir.parent().unwrap(), scratch.path());
        assert_eq!(dir.file_name().unwrap(), "0003-group_sub-.._escape");
    }
}
