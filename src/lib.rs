//! # depot
//!
//! A pluggable object store with short links and batched git sync.
//!
//! depot stores opaque binary objects and short URL redirects behind one
//! interface while the bytes live in interchangeable backends: a flat
//! directory of content-addressed files, a git working tree, or an embedded
//! SQLite store. Mutations of the embedded stores are batched and pushed to
//! a version-control remote on a time-boxed cadence.
//!
//! ## Core Concepts
//!
//! - **Backends**: store/retrieve/list/delete over one storage medium,
//!   selected by name from a registry
//! - **Short links**: generated collision-checked codes mapping to URLs,
//!   with access counting
//! - **Sync**: a watermark-gated stage/commit/push sequence that advances
//!   its watermark only when the push fully succeeds
//!
//! ## Example
//!
//! ```ignore
//! use depot::{Config, Depot};
//!
//! let depot = Depot::open(Config::with_root("/srv/depot"))?;
//! let receipt = depot.backends().get("record")?
//!     .store("notes.txt", b"hello", "text/plain", Some("notes.txt"))?;
//! let code = depot.links().shorten("https://example.com/docs", None)?;
//! ```

pub mod activity;
pub mod backend;
pub mod codegen;
pub mod config;
pub mod links;
pub mod sync;
pub mod vcs;

mod db;
mod depot;
mod error;

pub use activity::{ActivityLog, ActivityRecord};
pub use backend::{
    Backend, BackendRegistry, FlatFileBackend, ObjectSummary, RecordStoreBackend, StoreReceipt,
    StoredObject, VcsTreeBackend,
};
pub use config::Config;
pub use depot::Depot;
pub use error::{Error, Result};
pub use links::{LinkRegistry, ShortLink};
pub use sync::{Clock, DirtyFlag, SyncCoordinator, SyncOutcome, SystemClock, Watermark};
pub use vcs::{CmdOutput, CommandRunner, GitCli, MockRunner};
