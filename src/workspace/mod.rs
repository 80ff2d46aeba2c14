//! Job Workspaces
//!
//! Every request works inside its own directory under a process-wide temp
//! root. A background sweeper deletes directories once they are older than
//! the age threshold, whether or not the response was delivered.
//!
//! Lifecycle:
//! 1. `ensure_temp_dir` once at startup
//! 2. `create_job_dir` per request; the handler fills `input/` and `output/`
//! 3. The response sender reads the result
//! 4. The sweeper reclaims the directory after `MAX_AGE_SECS`
//!
//! No lock is shared between handlers and the sweeper. A request that runs
//! longer than the threshold can lose its workspace; the threshold is chosen
//! far above expected request latency.

pub mod manager;
pub mod sweeper;
pub mod types;

pub use manager::{default_temp_root, WorkspaceManager};
pub use sweeper::{
    age_at, periodic_cleanup, reclaim, sweep_once, CleanupTask, Clock, FsRemover, SystemClock,
    WorkspaceRemover,
};
pub use types::*;
