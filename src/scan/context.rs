//! Shared per-run state
//!
//! One `RunContext` is created per run and handed to every stage. It holds
//! the aggregate counters and the abort flag that lets a failing stage stop
//! the others.

use crate::error::{Result, ScanError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Counters and abort flag shared by all stages of a run
#[derive(Debug, Default)]
pub struct RunContext {
    new: AtomicU64,
    changed: AtomicU64,
    unchanged: AtomicU64,
    deleted: AtomicU64,
    flags_cleared: AtomicU64,
    bytes_digested: AtomicU64,
    files_discovered: AtomicU64,
    aborted: AtomicBool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_new(&self) {
        self.new.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_changed(&self) {
        self.changed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flags_cleared(&self, count: u64) {
        self.flags_cleared.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_digested(&self, bytes: u64) {
        self.bytes_digested.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_discovered(&self) {
        self.files_discovered.fetch_add(1, Ordering::Relaxed);
    }

    /// Ask every stage to stop; the run will roll back
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Point-in-time copy of the counters
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            new: self.new.load(Ordering::Relaxed),
            changed: self.changed.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            flags_cleared: self.flags_cleared.load(Ordering::Relaxed),
            bytes_digested: self.bytes_digested.load(Ordering::Relaxed),
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
        }
    }

    /// Cross-check the counters before commit
    ///
    /// Every file classified in a persisting run ends up visited and gets
    /// its flag cleared by exactly one sweep. A dry run never touches flags.
    pub fn verify(&self, persist: bool) -> Result<()> {
        self.counts().verify(persist)
    }
}

/// Snapshot of the run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub new: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub deleted: u64,
    pub flags_cleared: u64,
    pub bytes_digested: u64,
    pub files_discovered: u64,
}

impl RunCounts {
    /// Files the classifiers confirmed as present
    pub fn classified(&self) -> u64 {
        self.new + self.changed + self.unchanged
    }

    pub fn verify(&self, persist: bool) -> Result<()> {
        let expected = if persist { self.classified() } else { 0 };
        if self.flags_cleared != expected {
            return Err(ScanError::StatsInconsistent(format!(
                "flags_cleared={}, expected {} (new={} changed={} unchanged={} persist={})",
                self.flags_cleared, expected, self.new, self.changed, self.unchanged, persist
            )));
        }
        Ok(())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counts: RunCounts,

    /// Whether the catalog was committed
    pub persisted: bool,

    pub duration: Duration,
}

impl RunSummary {
    /// Classified files per second
    pub fn files_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.counts.classified() as f64 / secs
        } else {
            0.0
        }
    }

    /// True when any file was reported
    pub fn has_changes(&self) -> bool {
        self.counts.new + self.counts.changed + self.counts.deleted > 0
    }
}
