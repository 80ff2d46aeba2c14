//! Workspace Manager
//!
//! Owns the temp root and hands out job workspaces:
//! - Idempotent temp root setup
//! - Collision-free `<millis>_<pid>` job ids
//! - Sweeps with the system clock and the real filesystem

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::sweeper::{sweep_once, CleanupTask, FsRemover, SystemClock};
use super::types::{JobId, JobWorkspace, Result, SweepPolicy, SweepReport, WorkspaceError};

/// Attempts at finding a free job directory name before giving up
const MAX_ID_ATTEMPTS: u32 = 16;

/// Temp root used by the server: `temp/` next to the crate manifest
pub fn default_temp_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("temp")
}

// ============================================================================
// Workspace Manager
// ============================================================================

/// Creates and reclaims job workspaces under one temp root
#[derive(Clone)]
pub struct WorkspaceManager {
    inner: Arc<WorkspaceManagerInner>,
}

struct WorkspaceManagerInner {
    root: PathBuf,
    policy: SweepPolicy,
    pid: u32,

    /// Millisecond component of the last allocated id
    last_millis: AtomicI64,
}

impl WorkspaceManager {
    /// Create a manager with the default sweep policy
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_policy(root, SweepPolicy::default())
    }

    pub fn with_policy(root: impl Into<PathBuf>, policy: SweepPolicy) -> Self {
        Self {
            inner: Arc::new(WorkspaceManagerInner {
                root: root.into(),
                policy,
                pid: std::process::id(),
                last_millis: AtomicI64::new(0),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn policy(&self) -> SweepPolicy {
        self.inner.policy
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Create the temp root if it does not exist yet
    ///
    /// Safe to call repeatedly and concurrently.
    pub async fn ensure_temp_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.root())
            .await
            .map_err(|source| WorkspaceError::TempRoot {
                path: self.root().to_path_buf(),
                source,
            })
    }

    /// Create a fresh, empty workspace for one request
    pub async fn create_job_dir(&self) -> Result<JobWorkspace> {
        self.ensure_temp_dir().await?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.next_id();
            let path = self.root().join(id.to_string());

            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    tracing::debug!(job_id = %id, path = %path.display(), "Created job workspace");
                    return Ok(JobWorkspace::new(id, path));
                }
                // Left behind by an earlier process that reused our pid
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(job_id = %id, "Job directory already exists, picking another id");
                }
                Err(source) => return Err(WorkspaceError::Create { path, source }),
            }
        }

        Err(WorkspaceError::IdsExhausted(MAX_ID_ATTEMPTS))
    }

    /// Allocate the next id; the millisecond part never repeats in this process
    fn next_id(&self) -> JobId {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .inner
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);

        JobId::new(now.max(previous + 1), self.inner.pid)
    }

    // ========================================================================
    // Reclamation
    // ========================================================================

    /// Run one sweep cycle against the wall clock
    pub async fn sweep(&self) -> SweepReport {
        sweep_once(self.root(), self.inner.policy.max_age, &SystemClock, &FsRemover).await
    }

    /// Start the periodic sweeper for this manager
    pub fn spawn_cleanup(&self) -> CleanupTask {
        CleanupTask::spawn(self.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_temp_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("temp");
        let manager = WorkspaceManager::new(&root);

        manager.ensure_temp_dir().await.unwrap();
        manager.ensure_temp_dir().await.unwrap();

        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_create_job_dir_creates_root_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("temp");
        let manager = WorkspaceManager::new(&root);

        let workspace = manager.create_job_dir().await.unwrap();

        assert!(workspace.path().is_dir());
        assert_eq!(workspace.path().parent(), Some(root.as_path()));
        assert_eq!(
            workspace.path().file_name().and_then(|n| n.to_str()),
            Some(workspace.id().to_string().as_str())
        );
        assert_eq!(workspace.id().pid(), std::process::id());
    }

    #[tokio::test]
    async fn test_ids_are_unique_in_a_burst() {
        let temp_dir = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(temp_dir.path());

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let workspace = manager.create_job_dir().await.unwrap();
            assert!(seen.insert(workspace.id()), "duplicate id {}", workspace.id());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ids_are_unique_under_concurrency() {
        let temp_dir = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(temp_dir.path());

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.create_job_dir().await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let workspace = handle.await.unwrap();
            assert!(workspace.path().is_dir());
            assert!(seen.insert(workspace.id()));
        }
        assert_eq!(seen.len(), 64);
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let temp_dir = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(temp_dir.path());

        let first = manager.create_job_dir().await.unwrap().id();
        let second = manager.create_job_dir().await.unwrap().id();

        assert!(second.millis() > first.millis());
    }

    #[tokio::test]
    async fn test_skips_leftover_directory() {
        let temp_dir = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(temp_dir.path());

        // Occupy the next few candidate names
        let now = Utc::now().timestamp_millis();
        for offset in 0..5 {
            let id = JobId::new(now + offset, std::process::id());
            let leftover = temp_dir.path().join(id.to_string());
            std::fs::create_dir(&leftover).unwrap();
            std::fs::write(leftover.join("stale.pdf"), b"stale").unwrap();
        }

        let workspace = manager.create_job_dir().await.unwrap();
        assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_prepare_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(temp_dir.path());
        let workspace = manager.create_job_dir().await.unwrap();

        let input = workspace.prepare_input().await.unwrap();
        let output = workspace.prepare_output().await.unwrap();

        assert!(input.ends_with("input") && input.is_dir());
        assert!(output.ends_with("output") && output.is_dir());
        assert_eq!(workspace.join("merged.pdf"), workspace.path().join("merged.pdf"));
    }
}
