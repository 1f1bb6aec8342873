//! dirsum - Directory Change Detection Against a Checksum Catalog
//!
//! Compares a directory tree with a previously recorded snapshot and
//! reports new, changed and deleted files. With `--update` the new snapshot
//! is written back to the catalog in a single transaction; otherwise the
//! catalog is left untouched.
//!
//! # Features
//!
//! - **Parallel Classification**: Multiple classifier threads each with
//!   their own read-only catalog connection digest files concurrently.
//!
//! - **Single Writer**: Every catalog mutation goes through one reconciler
//!   thread owning one transaction, so a run is all-or-nothing.
//!
//! - **Scoped Rescans**: Restrict a run to subtrees; entries outside the
//!   scopes are never swept.
//!
//! - **Size-Only Mode**: Skip reading contents and compare sizes only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Discovery (walkdir)                         │
//! │          (relative path, size), exclude/include applied         │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ bounded channel
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Classifier Threads                          │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐        ┌──────────┐   │
//! │  │Classif. 1│  │Classif. 2│  │Classif. 3│  ...   │Classif. N│   │
//! │  │ lookup   │  │ lookup   │  │ lookup   │        │ lookup   │   │
//! │  │ md5      │  │ md5      │  │ md5      │        │ md5      │   │
//! │  └────┬─────┘  └────┬─────┘  └────┬─────┘        └────┬─────┘   │
//! │       └─────────────┴──────┬──────┴───────────────────┘         │
//! │                            ▼                                    │
//! │            ┌──────────────────────────────┐                     │
//! │            │   Reconcile Queue            │                     │
//! │            │  (crossbeam bounded)         │                     │
//! │            └──────────────┬───────────────┘                     │
//! │                           ▼                                     │
//! │            ┌──────────────────────────────┐                     │
//! │            │   Reconciler                 │                     │
//! │            │  - insert / update / mark    │                     │
//! │            │  - per-scope sweep           │                     │
//! │            └──────────────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │ commit / rollback
//!                               ▼
//!                    ┌──────────────────┐
//!                    │  SQLite catalog  │
//!                    │  (.checksum.db)  │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Record the first snapshot
//! dirsum /data --update
//!
//! # Later: what changed?
//! dirsum /data
//!
//! # Rescan one subtree and record it
//! dirsum /data photos/2023 --update
//! ```

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod progress;
pub mod scan;

pub use config::{CliArgs, PathFilter, ScanConfig};
pub use error::{Result, ScanError};
pub use scan::{ResultSink, RunSummary, ScanCoordinator, Scope};
