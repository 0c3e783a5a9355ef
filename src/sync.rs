//! Batched synchronization to the version-control remote
//!
//! The embedded stores write to plain SQLite files; this module decides when
//! those files must be pushed to the remote and drives the
//! stage/commit/push sequence. The decision is evaluated purely from a
//! persisted watermark, and the watermark is advanced if and only if the
//! push fully succeeded, so a crash at any earlier step leaves the next
//! invocation to re-attempt the whole sequence.

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::vcs::{CmdOutput, CommandRunner};
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock, injectable for tests.
pub trait Clock: Send + Sync {
    /// Current time as unix seconds
    fn now(&self) -> u64;
}

/// The real wall clock
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Shared CLEAN/DIRTY bookkeeping.
///
/// Any mutation of the embedded stores marks the flag; only a fully
/// successful push clears it. Marking an already-dirty flag is a no-op.
#[derive(Clone, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    pub fn new() -> Self {
        DirtyFlag::default()
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Timestamp of the last successful sync, persisted as a plain scalar file.
pub struct Watermark {
    path: PathBuf,
}

impl Watermark {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Watermark {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the last-sync timestamp. A missing or unreadable file reads as
    /// `None`, which makes the next decision err on the side of syncing.
    pub fn read(&self) -> Option<u64> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        content.trim().parse().ok()
    }

    /// Persist a new timestamp. Called only after a push fully succeeds.
    pub fn write(&self, timestamp: u64) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, timestamp.to_string())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Outcome of one sync invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The interval since the last successful sync has not elapsed
    NotNeeded,
    /// The tree was staged but held no pending changes
    NothingToCommit,
    /// Staged, committed, and pushed; watermark advanced
    Completed { timestamp: u64 },
}

/// Drives the stage/commit/push sequence against the main repository.
///
/// Invoked externally on a fixed cadence; never self-scheduled. Safe to call
/// arbitrarily often: a not-needed invocation has no side effects, and a
/// failed push leaves the watermark untouched so the next invocation retries
/// from scratch.
pub struct SyncCoordinator {
    runner: Box<dyn CommandRunner>,
    watermark: Watermark,
    dirty: DirtyFlag,
    activity: ActivityLog,
    clock: Arc<dyn Clock>,
    data_dir: PathBuf,
    interval_secs: u64,
    remote: String,
    branch: String,
}

impl SyncCoordinator {
    pub fn new(
        config: &Config,
        runner: Box<dyn CommandRunner>,
        dirty: DirtyFlag,
        activity: ActivityLog,
    ) -> Self {
        SyncCoordinator {
            runner,
            watermark: Watermark::new(&config.watermark_file),
            dirty,
            activity,
            clock: Arc::new(SystemClock),
            data_dir: config.data_dir.clone(),
            interval_secs: config.sync_interval_secs,
            remote: config.sync_remote.clone(),
            branch: config.sync_branch.clone(),
        }
    }

    /// Replace the wall clock (for tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }

    /// Timestamp of the last successful sync, if any
    pub fn last_sync(&self) -> Option<u64> {
        self.watermark.read()
    }

    /// True if no successful sync is recorded, or the interval has elapsed
    /// since the last one. Evaluated purely from the persisted watermark.
    pub fn is_sync_needed(&self) -> bool {
        match self.watermark.read() {
            None => true,
            Some(last) => self.clock.now().saturating_sub(last) >= self.interval_secs,
        }
    }

    /// Run the sync sequence.
    ///
    /// Steps: decision, stage, status probe, commit, push, watermark. Every
    /// failure aborts without touching the watermark. Staging is idempotent,
    /// so a failed push retries cleanly on the next invocation.
    pub fn perform_sync(&self) -> Result<SyncOutcome> {
        if !self.is_sync_needed() {
            return Ok(SyncOutcome::NotNeeded);
        }

        let data_dir = self.data_dir.to_string_lossy();
        self.run_step(&["add", &data_dir], Error::StageFailure)?;

        let status = self.run_step(&["status", "--porcelain"], Error::VcsCommand)?;
        if status.lines.iter().all(|l| l.trim().is_empty()) {
            tracing::debug!("sync: nothing to commit");
            return Ok(SyncOutcome::NothingToCommit);
        }

        let now = self.clock.now();
        let message = format!("Auto-sync: update data files at {}", now);
        self.run_step(&["commit", "-m", &message], Error::CommitFailure)?;

        self.run_step(&["push", &self.remote, &self.branch], Error::PushFailure)?;

        self.watermark.write(now)?;
        self.dirty.clear();
        self.activity
            .record("sync_complete", "system", None, "Data sync completed successfully");
        tracing::debug!("sync: pushed and advanced watermark to {}", now);

        Ok(SyncOutcome::Completed { timestamp: now })
    }

    fn run_step(&self, args: &[&str], wrap: fn(String) -> Error) -> Result<CmdOutput> {
        let output = self.runner.run(args).map_err(|e| wrap(e.to_string()))?;
        if !output.ok() {
            return Err(wrap(output.joined()));
        }
        Ok(output)
    }
}
