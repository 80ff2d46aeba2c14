//! Workspace types

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Time between two sweep cycles: 60 seconds
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Age after which a job workspace may be reclaimed: 10 minutes
pub const MAX_AGE_SECS: u64 = 600;

/// Name of the directory holding uploaded inputs
pub const INPUT_DIR: &str = "input";

/// Name of the directory holding generated outputs
pub const OUTPUT_DIR: &str = "output";

// ============================================================================
// Sweep Policy
// ============================================================================

/// Timing of the reclamation sweeper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Pause between two sweep cycles
    pub interval: Duration,
    /// Workspaces strictly older than this are reclaimed
    pub max_age: Duration,
}

impl SweepPolicy {
    pub fn new(interval: Duration, max_age: Duration) -> Self {
        Self { interval, max_age }
    }

    /// Whether a workspace of the given age is eligible for deletion
    pub fn is_expired(&self, age: Duration) -> bool {
        age > self.max_age
    }
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
            max_age: Duration::from_secs(MAX_AGE_SECS),
        }
    }
}

// ============================================================================
// Job Identity
// ============================================================================

/// Identifier of a job workspace: `<millis>_<pid>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId {
    millis: i64,
    pid: u32,
}

impl JobId {
    pub fn new(millis: i64, pid: u32) -> Self {
        Self { millis, pid }
    }

    /// Milliseconds since the Unix epoch at allocation time
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Id of the process that allocated the workspace
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.millis, self.pid)
    }
}

// ============================================================================
// Job Workspace
// ============================================================================

/// Handle to a per-request working directory
///
/// The handle does not own the directory in the RAII sense: dropping it
/// leaves the directory in place for the response sender, and the sweeper
/// removes it once it has aged out.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: JobId,
    path: PathBuf,
}

impl JobWorkspace {
    pub(crate) fn new(id: JobId, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file directly inside the workspace
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.path.join(INPUT_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path.join(OUTPUT_DIR)
    }

    /// Create `input/` and return its path
    pub async fn prepare_input(&self) -> Result<PathBuf> {
        self.create_subdir(self.input_dir()).await
    }

    /// Create `output/` and return its path
    pub async fn prepare_output(&self) -> Result<PathBuf> {
        self.create_subdir(self.output_dir()).await
    }

    async fn create_subdir(&self, dir: PathBuf) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WorkspaceError::Subdirectory {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }
}

// ============================================================================
// Reclamation Results
// ============================================================================

/// Outcome of one best-effort deletion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// The directory tree was deleted
    Removed,
    /// Something else deleted it first
    AlreadyGone,
    /// Deletion failed; the directory is retried on the next cycle
    Failed(String),
}

/// Tally of one sweep cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Subdirectories of the temp root that were inspected
    pub scanned: usize,
    pub removed: usize,
    pub already_gone: usize,
    pub failed: usize,
    /// Subdirectories still younger than the age threshold
    pub retained: usize,
}

impl SweepReport {
    pub(crate) fn record(&mut self, outcome: &ReclaimOutcome) {
        match outcome {
            ReclaimOutcome::Removed => self.removed += 1,
            ReclaimOutcome::AlreadyGone => self.already_gone += 1,
            ReclaimOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Directories no longer present after this cycle
    pub fn reclaimed(&self) -> usize {
        self.removed + self.already_gone
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Workspace setup errors
///
/// Sweep failures never show up here; they are folded into [`SweepReport`].
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Failed to create temp root {}: {source}", .path.display())]
    TempRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create job workspace {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create workspace directory {}: {source}", .path.display())]
    Subdirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No free job id after {0} attempts")]
    IdsExhausted(u32),
}

/// Result type alias for workspace operations
pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_format() {
        let id = JobId::new(1_700_000_000_123, 4242);
        assert_eq!(id.to_string(), "1700000000123_4242");
        assert_eq!(id.millis(), 1_700_000_000_123);
        assert_eq!(id.pid(), 4242);
    }

    #[test]
    fn test_policy_threshold_is_strict() {
        let policy = SweepPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert!(!policy.is_expired(Duration::from_secs(600)));
        assert!(policy.is_expired(Duration::from_secs(601)));
    }

    #[test]
    fn test_report_tally() {
        let mut report = SweepReport::default();
        report.record(&ReclaimOutcome::Removed);
        report.record(&ReclaimOutcome::AlreadyGone);
        report.record(&ReclaimOutcome::Failed("busy".into()));

        assert_eq!(report.removed, 1);
        assert_eq!(report.already_gone, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.reclaimed(), 2);
    }
}
