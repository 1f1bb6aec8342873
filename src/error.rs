//! Error types for dirsum
//!
//! This module defines the error hierarchy for a scan run:
//! - Catalog (SQLite) errors, including row-count assertion failures
//! - Digest errors (read failures, torn reads)
//! - Walk errors from local discovery
//! - Configuration and CLI errors
//! - Worker thread errors
//!
//! Every error here is fatal for the run. Nothing is retried; a failed run
//! rolls back and the operator re-invokes the tool.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a scan run
#[derive(Error, Debug)]
pub enum ScanError {
    /// Catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Digest computation errors
    #[error("Digest error: {0}")]
    Digest(#[from] DigestError),

    /// Directory traversal errors
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Result stream could not be written
    #[error("Failed to write result stream: {0}")]
    Output(#[source] std::io::Error),

    /// Aggregate counters disagree with each other before commit
    #[error("Stats inconsistent: {0}")]
    StatsInconsistent(String),

    /// Stopped because another stage of the pipeline failed
    #[error("Run aborted after a failure in another stage")]
    Aborted,
}

impl ScanError {
    /// True for errors that only report that some other stage failed first
    pub fn is_secondary(&self) -> bool {
        matches!(
            self,
            ScanError::Aborted | ScanError::Worker(WorkerError::ReconcilerGone)
        )
    }
}

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open the catalog file
    #[error("Failed to open catalog '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// A mutation touched an unexpected number of rows
    #[error("{op} '{path}' affected {actual} rows, expected {expected}")]
    RowCount {
        op: &'static str,
        path: String,
        expected: u64,
        actual: u64,
    },

    /// A scope reached the catalog in a form it cannot sweep
    #[error("Invalid scope '{0}': trailing separator")]
    InvalidScope(String),
}

/// Digest computation errors
#[derive(Error, Debug)]
pub enum DigestError {
    /// Failed to open or read the file
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File length changed between discovery and digesting
    #[error("Size mismatch for '{path}': expected {expected} bytes, read {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// Local discovery errors
#[derive(Error, Debug)]
pub enum WalkError {
    /// Directory could not be read or an entry could not be stat'ed
    #[error("Failed to walk '{path}': {reason}")]
    Traverse { path: PathBuf, reason: String },

    /// Path cannot be represented in the catalog
    #[error("Path is not valid UTF-8: '{path}'")]
    NonUtf8 { path: PathBuf },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid exclude/include pattern
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Root directory unusable
    #[error("Invalid root '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Catalog path unusable
    #[error("Invalid catalog path '{path}': {reason}")]
    InvalidCatalogPath { path: PathBuf, reason: String },

    /// Malformed scope argument
    #[error("Invalid scope '{scope}': {reason}")]
    InvalidScope { scope: String, reason: String },

    /// Two scopes cover the same catalog entries
    #[error("Scopes '{first}' and '{second}' overlap")]
    OverlappingScopes { first: String, second: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("{name} panicked: {message}")]
    Panicked { name: String, message: String },

    /// Thread could not be started
    #[error("Failed to start {name}: {reason}")]
    InitFailed { name: String, reason: String },

    /// The reconciler stopped accepting commands
    #[error("Reconciler channel closed unexpectedly")]
    ReconcilerGone,
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for CatalogError
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
