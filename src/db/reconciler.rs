//! Serialized catalog reconciler
//!
//! The reconciler runs in a dedicated thread, owns the only write
//! connection, and applies every catalog mutation of a run inside one
//! transaction. Commands arrive over a bounded channel from the classifier
//! pool and are applied strictly in arrival order, so for any path the
//! insert/update/mark lands before the sweep that would otherwise treat it
//! as stale.
//!
//! When the channel closes the counters are verified, the summary line is
//! logged, and the transaction is committed (persisting run) or rolled back
//! (dry run, or any stage aborted).

use crate::db::catalog;
use crate::error::{CatalogError, Result, ScanError, WorkerError};
use crate::scan::{Change, ResultSink, RunContext, Scope};
use crossbeam_channel::{bounded, Receiver, Sender};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace};

/// Messages from the classifier pool (and coordinator) to the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileCommand {
    /// Path absent from the catalog
    Insert {
        path: String,
        size: u64,
        digest: Option<String>,
    },

    /// Path present with different metadata
    UpdateAndMark {
        path: String,
        size: u64,
        digest: Option<String>,
    },

    /// Path present and nothing to persist
    Mark { path: String },

    /// End of a scope: everything still unvisited in it is stale
    SweepScope(Scope),
}

/// Handle to the reconciler thread
pub struct Reconciler {
    handle: Option<JoinHandle<Result<()>>>,
    sender: Sender<ReconcileCommand>,
}

impl Reconciler {
    /// Spawn the reconciler thread
    ///
    /// `queue_size` bounds the channel from the classifier pool.
    pub fn spawn(
        conn: Connection,
        persist: bool,
        queue_size: usize,
        sink: ResultSink,
        ctx: Arc<RunContext>,
    ) -> Result<Self> {
        let (sender, receiver) = bounded(queue_size);

        let handle = thread::Builder::new()
            .name("reconciler".into())
            .spawn(move || {
                let result = reconcile_loop(conn, receiver, persist, &sink, &ctx);
                if result.is_err() {
                    ctx.abort();
                }
                result
            })
            .map_err(|e| WorkerError::InitFailed {
                name: "reconciler".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
            sender,
        })
    }

    /// A sender for commands
    pub fn sender(&self) -> Sender<ReconcileCommand> {
        self.sender.clone()
    }

    /// Close this handle's sender and wait for the transaction to finish
    ///
    /// All other senders must already be dropped, otherwise this blocks.
    pub fn finish(mut self) -> Result<()> {
        let handle = self.handle.take();
        drop(self);

        match handle {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked {
                    name: "reconciler".into(),
                    message: "Reconciler thread panicked".into(),
                }
                .into()),
            },
            None => Ok(()),
        }
    }
}

/// Internal reconciler thread function
fn reconcile_loop(
    mut conn: Connection,
    receiver: Receiver<ReconcileCommand>,
    persist: bool,
    sink: &ResultSink,
    ctx: &RunContext,
) -> Result<()> {
    debug!(persist, "Reconciler starting");
    // Spilling dirty pages of a rollback-journal catalog takes an EXCLUSIVE
    // lock until commit, which locks out the classifiers' readers.
    conn.pragma_update(None, "cache_spill", false)
        .map_err(CatalogError::from)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(CatalogError::from)?;

    {
        let mut applier = Applier {
            conn: &tx,
            persist,
            sink,
            ctx,
        };
        for command in receiver.iter() {
            trace!(?command, "Applying");
            applier.apply(command)?;
        }
    }

    if ctx.is_aborted() {
        debug!("Run aborted, rolling back");
        tx.rollback().map_err(CatalogError::from)?;
        return Err(ScanError::Aborted);
    }

    let counts = ctx.counts();
    info!(
        new = counts.new,
        changed = counts.changed,
        deleted = counts.deleted,
        unchanged = counts.unchanged,
        flags_cleared = counts.flags_cleared,
        "Run stats"
    );
    counts.verify(persist)?;
    sink.flush()?;

    if persist {
        tx.commit().map_err(CatalogError::from)?;
        debug!("Catalog committed");
    } else {
        tx.rollback().map_err(CatalogError::from)?;
        debug!("Dry run, catalog left unchanged");
    }
    Ok(())
}

/// Applies commands against the open transaction
struct Applier<'a> {
    conn: &'a Connection,
    persist: bool,
    sink: &'a ResultSink,
    ctx: &'a RunContext,
}

impl Applier<'_> {
    fn apply(&mut self, command: ReconcileCommand) -> Result<()> {
        match command {
            ReconcileCommand::Insert { path, size, digest } => {
                catalog::insert(self.conn, &path, size, digest.as_deref())?
            }
            ReconcileCommand::UpdateAndMark { path, size, digest } => {
                catalog::update_and_mark(self.conn, &path, size, digest.as_deref())?
            }
            ReconcileCommand::Mark { path } => catalog::mark(self.conn, &path)?,
            ReconcileCommand::SweepScope(scope) => self.sweep(&scope)?,
        }
        Ok(())
    }

    fn report_deleted(&self, path: &str) -> Result<()> {
        self.sink.report(Change::Deleted, path)?;
        self.ctx.record_deleted();
        Ok(())
    }

    /// Report, delete and reset the entries of one finished scope
    ///
    /// The entry at the prefix itself is resolved by exact lookup first:
    /// a range query on `prefix/` alone would miss a file literally named
    /// `prefix`, and a plain prefix match would also hit `prefixabc`.
    fn sweep(&mut self, scope: &Scope) -> Result<()> {
        let prefix = scope.as_str();
        if prefix.ends_with('/') {
            return Err(CatalogError::InvalidScope(prefix.to_string()).into());
        }

        let mut stale = 0u64;
        let mut exact_visited = false;

        if !scope.is_root() {
            match catalog::lookup(self.conn, prefix)? {
                Some(entry) if entry.visited => exact_visited = true,
                Some(entry) => {
                    self.report_deleted(&entry.path)?;
                    stale += 1;
                }
                None => {}
            }
        }

        for entry in catalog::query_unvisited_below(self.conn, prefix)? {
            self.report_deleted(&entry.path)?;
            stale += 1;
        }

        if !self.persist {
            return Ok(());
        }

        let removed = catalog::delete_unvisited(self.conn, prefix)?;
        if removed != stale {
            return Err(CatalogError::RowCount {
                op: "delete unvisited",
                path: prefix.to_string(),
                expected: stale,
                actual: removed,
            }
            .into());
        }

        let mut cleared = 0u64;
        if exact_visited {
            catalog::clear_visited_flag(self.conn, prefix)?;
            cleared += 1;
        }
        cleared += catalog::clear_visited_flags(self.conn, prefix)?;
        self.ctx.record_flags_cleared(cleared);

        debug!(scope = %scope, removed, cleared, "Scope swept");
        Ok(())
    }
}
