//! Catalog storage
//!
//! The catalog is a single SQLite table keyed by relative path. Classifier
//! threads read it through their own read-only connections; every mutation
//! goes through the reconciler thread and its one transaction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Classifier Threads (N)                 │
//! │  - lookup() on a read-only connection               │
//! │  - Send commands via bounded channel                │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ ReconcileCommand
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                Reconciler Thread                    │
//! │  - Owns the write connection                        │
//! │  - One BEGIN IMMEDIATE transaction per run          │
//! │  - Sweeps stale entries per scope                   │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ commit (--update) / rollback
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 SQLite Catalog                      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod reconciler;
pub mod schema;

pub use catalog::CatalogEntry;
pub use reconciler::{ReconcileCommand, Reconciler};
pub use schema::{open_catalog, open_reader};
