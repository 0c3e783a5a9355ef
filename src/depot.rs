//! High-level service API
//!
//! This module wires the configured backends, link registry, activity log,
//! and sync coordinator into one entry point.

use crate::activity::ActivityLog;
use crate::backend::{BackendRegistry, FlatFileBackend, RecordStoreBackend, VcsTreeBackend};
use crate::config::Config;
use crate::links::LinkRegistry;
use crate::sync::{DirtyFlag, SyncCoordinator};
use crate::vcs::{CommandRunner, GitCli};
use crate::Result;
use std::time::Duration;

/// The assembled storage service
///
/// Provides:
/// - Backend selection by name (`flat`, `vcs`, `record`)
/// - Short link creation and resolution
/// - The periodic sync entry point
pub struct Depot {
    config: Config,
    backends: BackendRegistry,
    links: LinkRegistry,
    activity: ActivityLog,
    sync: SyncCoordinator,
}

impl Depot {
    /// Open the service with real git runners derived from the config.
    pub fn open(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.git_timeout_secs);
        let vcs_runner = Box::new(GitCli::new(&config.vcs_dir).with_timeout(timeout));
        let sync_runner = Box::new(GitCli::new(&config.repo_dir).with_timeout(timeout));
        Self::open_with_runners(config, vcs_runner, sync_runner)
    }

    /// Open with explicit command runners. Tests pass mocks here so no real
    /// git binary is ever invoked.
    pub fn open_with_runners(
        config: Config,
        vcs_runner: Box<dyn CommandRunner>,
        sync_runner: Box<dyn CommandRunner>,
    ) -> Result<Self> {
        let dirty = DirtyFlag::new();

        let mut backends = BackendRegistry::new();
        backends.register(Box::new(FlatFileBackend::new(&config.flat_dir)));
        backends.register(Box::new(VcsTreeBackend::open(&config.vcs_dir, vcs_runner)?));
        backends.register(Box::new(RecordStoreBackend::open(
            &config.files_db,
            ActivityLog::open(&config.activity_db),
            dirty.clone(),
        )?));

        let links = LinkRegistry::open(
            &config.links_db,
            ActivityLog::open(&config.activity_db),
            dirty.clone(),
        )?;

        let sync = SyncCoordinator::new(
            &config,
            sync_runner,
            dirty,
            ActivityLog::open(&config.activity_db),
        );

        let activity = ActivityLog::open(&config.activity_db);

        Ok(Depot {
            config,
            backends,
            links,
            activity,
            sync,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn links(&self) -> &LinkRegistry {
        &self.links
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }
}
