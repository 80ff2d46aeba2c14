//! Reclamation Sweeper
//!
//! Deletes job workspaces that outlived the age threshold. Every deletion is
//! best-effort: failures are logged at debug level and retried implicitly on
//! the next cycle.

use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::manager::WorkspaceManager;
use super::types::{ReclaimOutcome, SweepReport};

// ============================================================================
// Seams
// ============================================================================

/// Time source for age computation
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Deletion primitive used by the sweeper
#[async_trait::async_trait]
pub trait WorkspaceRemover: Send + Sync {
    /// Recursively delete a workspace directory
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Deletes directories from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

#[async_trait::async_trait]
impl WorkspaceRemover for FsRemover {
    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }
}

// ============================================================================
// Sweep Cycle
// ============================================================================

/// Age of an entry at `now`; modification times in the future count as zero
pub fn age_at(now: SystemTime, modified: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}

/// Attempt to delete one workspace, classifying the result
pub async fn reclaim(remover: &dyn WorkspaceRemover, path: &Path) -> ReclaimOutcome {
    match remover.remove(path).await {
        Ok(()) => ReclaimOutcome::Removed,
        Err(e) if e.kind() == ErrorKind::NotFound => ReclaimOutcome::AlreadyGone,
        Err(e) => ReclaimOutcome::Failed(e.to_string()),
    }
}

/// Run one sweep over the immediate subdirectories of `root`
///
/// The clock is read once, at the start of the cycle. Directories whose age
/// exceeds `max_age` are deleted; plain files and symlinks are left alone.
/// Nothing in here returns an error: an unreadable root yields an empty report.
pub async fn sweep_once(
    root: &Path,
    max_age: Duration,
    clock: &dyn Clock,
    remover: &dyn WorkspaceRemover,
) -> SweepReport {
    let mut report = SweepReport::default();
    let now = clock.now();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "Temp root not readable, skipping sweep");
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Listing temp root failed mid-sweep");
                break;
            }
        };

        // Raced with another deletion
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }

        report.scanned += 1;

        let age = metadata
            .modified()
            .map(|modified| age_at(now, modified))
            .unwrap_or(Duration::ZERO);

        if age <= max_age {
            report.retained += 1;
            continue;
        }

        let path = entry.path();
        let outcome = reclaim(remover, &path).await;
        match &outcome {
            ReclaimOutcome::Removed => {
                tracing::debug!(path = %path.display(), age_secs = age.as_secs(), "Reclaimed job workspace");
            }
            ReclaimOutcome::AlreadyGone => {
                tracing::debug!(path = %path.display(), "Job workspace already removed");
            }
            ReclaimOutcome::Failed(reason) => {
                tracing::debug!(path = %path.display(), reason = %reason, "Could not reclaim job workspace");
            }
        }
        report.record(&outcome);
    }

    report
}

// ============================================================================
// Background Task
// ============================================================================

/// Sweep `manager`'s temp root every `interval` until `token` is cancelled
///
/// The first cycle runs immediately. Cancellation is honoured while sleeping
/// and while sweeping; a deletion already handed to the blocking pool is left
/// to finish on its own.
pub async fn periodic_cleanup(
    manager: WorkspaceManager,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        root = %manager.root().display(),
        interval_secs = interval.as_secs(),
        max_age_secs = manager.policy().max_age.as_secs(),
        "Workspace cleanup task started"
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = token.cancelled() => break,
            report = manager.sweep() => {
                if report.scanned > 0 {
                    tracing::debug!(
                        scanned = report.scanned,
                        removed = report.removed,
                        already_gone = report.already_gone,
                        failed = report.failed,
                        retained = report.retained,
                        "Workspace sweep finished"
                    );
                }
            }
        }
    }

    tracing::info!("Workspace cleanup task stopped");
}

/// Handle to the running sweeper
///
/// Started once at process startup and shut down at teardown.
pub struct CleanupTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Spawn the sweeper on the current runtime using the manager's policy
    pub fn spawn(manager: WorkspaceManager) -> Self {
        let token = CancellationToken::new();
        let interval = manager.policy().interval;
        let handle = tokio::spawn(periodic_cleanup(manager, interval, token.clone()));

        Self { token, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the sweeper and wait for the task to exit
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::warn!("Workspace cleanup task ended abnormally: {}", e);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
