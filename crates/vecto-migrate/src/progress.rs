//! Progress tracking for migration batches.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Progress update information.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current phase of the batch or of the entry named in `current_item`.
    pub phase: MigrationPhase,

    /// Entry being processed.
    pub current_item: Option<String>,

    /// Entries finished so far.
    pub completed: u64,

    /// Entries in the batch.
    pub total: u64,

    /// Optional message.
    pub message: Option<String>,
}

/// Phases of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MigrationPhase {
    /// Loading configuration and repository map.
    Initializing = 0,
    /// Creating the scratch directory.
    AllocatingWorkspace = 1,
    /// Preparing the destination repository.
    CreatingRepository = 2,
    /// Mirror-cloning the source repository.
    CloningRepository = 3,
    /// Pointing the clone at the destination.
    RepointingRemote = 4,
    /// Mirror-pushing to the destination.
    PushingRepository = 5,
    /// Removing the scratch directory.
    CleaningUp = 6,
    /// Batch finished.
    Complete = 7,
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing"),
            Self::AllocatingWorkspace => write!(f, "Allocating workspace"),
            Self::CreatingRepository => write!(f, "Creating repository"),
            Self::CloningRepository => write!(f, "Cloning source repository"),
            Self::RepointingRemote => write!(f, "Setting destination remote"),
            Self::PushingRepository => write!(f, "Pushing to destination"),
            Self::CleaningUp => write!(f, "Cleaning up"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

impl MigrationPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Initializing,
            1 => Self::AllocatingWorkspace,
            2 => Self::CreatingRepository,
            3 => Self::CloningRepository,
            4 => Self::RepointingRemote,
            5 => Self::PushingRepository,
            6 => Self::CleaningUp,
            _ => Self::Complete,
        }
    }
}

/// Progress tracker for a migration batch.
pub struct MigrationProgress {
    phase: AtomicU8,
    completed: AtomicU64,
    total: AtomicU64,
    callback: Option<Arc<ProgressCallback>>,
}

impl MigrationProgress {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(MigrationPhase::Initializing as u8),
            completed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            callback: None,
        }
    }

    /// Create a progress tracker with a callback.
    pub fn with_callback(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
            ..Self::new()
        }
    }

    /// Start a batch of `total` entries.
    pub fn start_batch(&self, total: u64) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.set_phase(MigrationPhase::AllocatingWorkspace);
    }

    /// Set the current phase.
    pub fn set_phase(&self, phase: MigrationPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
        self.notify(None, None);
    }

    /// Record that `item` entered `phase`.
    pub fn entry_phase(&self, item: &str, phase: MigrationPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
        self.notify(Some(item.to_string()), None);
    }

    /// Record that `item` finished, with a short outcome label.
    pub fn entry_finished(&self, item: &str, outcome: &str) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.notify(Some(item.to_string()), Some(outcome.to_string()));
    }

    /// Entries finished so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Get current progress percentage.
    pub fn percentage(&self) -> f64 {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }
        let completed = self.completed.load(Ordering::SeqCst);
        (completed as f64 / total as f64) * 100.0
    }

    /// Get current phase.
    pub fn current_phase(&self) -> MigrationPhase {
        MigrationPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn notify(&self, current_item: Option<String>, message: Option<String>) {
        if let Some(callback) = &self.callback {
            let update = ProgressUpdate {
                phase: self.current_phase(),
                current_item,
                completed: self.completed.load(Ordering::SeqCst),
                total: self.total.load(Ordering::SeqCst),
                message,
            };
            callback(update);
        }
    }
}

impl Default for MigrationProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MigrationProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationProgress")
            .field("phase", &self.current_phase())
            .field("completed", &self.completed.load(Ordering::SeqCst))
            .field("total", &self.total.load(Ordering::SeqCst))
            .finish()
    }
}

/// Console progress reporter using indicatif.
pub struct ConsoleProgressReporter {
    progress_bar: indicatif::ProgressBar,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter.
    pub fn new() -> Self {
        let progress_bar = indicatif::ProgressBar::new(0);

        // The template is a literal; fall back to the default style rather
        // than failing the run over cosmetics.
        let style = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
        progress_bar.set_style(style);

        Self { progress_bar }
    }

    /// Create a progress callback for use with a migration run.
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.progress_bar.clone();
        Box::new(move |update: ProgressUpdate| {
            pb.set_length(update.total);
            pb.set_position(update.completed);

            let mut msg = update.phase.to_string();
            if let Some(item) = &update.current_item {
                msg = format!("{msg}: {item}");
            }
            if let Some(message) = &update.message {
                msg = format!("{msg} - {message}");
            }
            pb.set_message(msg);
        })
    }

    /// Finish the progress bar.
    pub fn finish(&self, message: &str) {
        self.progress_bar.finish_with_message(message.to_string());
    }
}

impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_progress_tracker() {
        let progress = MigrationProgress::new();

        progress.start_batch(4);
        assert_eq!(progress.current_phase(), MigrationPhase::AllocatingWorkspace);
        assert_eq!(progress.percentage(), 0.0);

        progress.entry_phase("p/r1 -> q/r1", MigrationPhase::PushingRepository);
        assert_eq!(progress.current_phase(), MigrationPhase::PushingRepository);

        progress.entry_finished("p/r1 -> q/r1", "SUCCESS");
        assert!((progress.percentage() - 25.0).abs() < 0.01);

        for _ in 0..3 {
            progress.entry_finished("x", "FAILED");
        }
        assert_eq!(progress.completed(), 4);
        assert!((progress.percentage() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_progress_with_callback() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        let progress = MigrationProgress::with_callback(Box::new(move |update| {
            sink.lock().push(update);
        }));

        progress.start_batch(2);
        progress.entry_phase("a", MigrationPhase::CloningRepository);
        progress.entry_finished("a", "SUCCESS");

        let updates = updates.lock();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[1].current_item.as_deref(), Some("a"));
        assert_eq!(updates[1].phase, MigrationPhase::CloningRepository);
        assert_eq!(updates[2].completed, 1);
        assert_eq!(updates[2].message.as_deref(), Some("SUCCESS"));
    }

    #[test]
    fn test_phase_roundtrip() {
        for phase in [
            MigrationPhase::Initializing,
            MigrationPhase::CreatingRepository,
            MigrationPhase::PushingRepository,
            MigrationPhase::Complete,
        ] {
            assert_eq!(MigrationPhase::from_u8(phase as u8), phase);
        }
    }
}
