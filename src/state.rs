//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::workspace::WorkspaceManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    workspaces: WorkspaceManager,
}

impl AppState {
    pub fn new(config: Config, workspaces: WorkspaceManager) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, workspaces }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the job workspace factory
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.inner.workspaces
    }
}
