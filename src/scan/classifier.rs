//! Classifier threads
//!
//! Each classifier:
//! - Opens its own read-only catalog connection
//! - Pulls one discovered file at a time from the shared channel
//! - Compares it against the catalog state as of the start of the run
//! - Reports NEW/CHANGED lines and sends a command to the reconciler
//!
//! Classifiers never write to the catalog. Any error raises the run's
//! abort flag so the other stages stop and the reconciler rolls back.

use crate::config::ScanConfig;
use crate::content::checksum_file;
use crate::db::{catalog, schema, ReconcileCommand};
use crate::error::{Result, WorkerError};
use crate::scan::{Change, DiscoveredFile, ResultSink, RunContext};
use crossbeam_channel::{Receiver, Sender};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// A classifier thread
pub struct Classifier {
    id: usize,
    handle: Option<JoinHandle<Result<()>>>,
}

impl Classifier {
    /// Spawn a new classifier thread
    pub fn spawn(
        id: usize,
        config: Arc<ScanConfig>,
        files: Receiver<DiscoveredFile>,
        commands: Sender<ReconcileCommand>,
        sink: ResultSink,
        ctx: Arc<RunContext>,
    ) -> std::result::Result<Self, WorkerError> {
        let name = format!("classifier-{}", id);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let result = classifier_loop(id, &config, files, commands, &sink, &ctx);
                if let Err(e) = &result {
                    if !e.is_secondary() {
                        error!(worker = id, error = %e, "Classifier failed");
                    }
                    ctx.abort();
                }
                result
            })
            .map_err(|e| WorkerError::InitFailed {
                name,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the classifier to finish
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked {
                    name: format!("classifier-{}", self.id),
                    message: "Classifier thread panicked".into(),
                }
                .into()),
            },
            None => Ok(()),
        }
    }
}

fn classifier_loop(
    id: usize,
    config: &ScanConfig,
    files: Receiver<DiscoveredFile>,
    commands: Sender<ReconcileCommand>,
    sink: &ResultSink,
    ctx: &RunContext,
) -> Result<()> {
    debug!(worker = id, "Classifier starting");
    let conn = schema::open_reader(&config.catalog_path)?;

    let mut processed = 0u64;
    for file in files.iter() {
        if ctx.is_aborted() {
            debug!(worker = id, "Run aborted, classifier stopping");
            break;
        }

        if let Some(command) = classify(&file, &conn, config, sink, ctx)? {
            commands
                .send(command)
                .map_err(|_| WorkerError::ReconcilerGone)?;
        }
        processed += 1;
    }

    debug!(worker = id, files = processed, "Classifier shutting down");
    Ok(())
}

/// Classify one discovered file against the catalog
///
/// Reports NEW and CHANGED on the result stream, bumps the run counters,
/// and returns the command the reconciler must apply (none for a new file
/// in a dry run).
pub fn classify(
    file: &DiscoveredFile,
    conn: &Connection,
    config: &ScanConfig,
    sink: &ResultSink,
    ctx: &RunContext,
) -> Result<Option<ReconcileCommand>> {
    let persist = config.persist;
    let path = file.path.clone();

    let stored = match catalog::lookup(conn, &file.path)? {
        Some(entry) => entry,
        None => {
            sink.report(Change::New, &file.path)?;
            ctx.record_new();
            if !persist {
                return Ok(None);
            }
            let digest = digest_unless_size_only(file, config, ctx)?;
            return Ok(Some(ReconcileCommand::Insert {
                path,
                size: file.size,
                digest,
            }));
        }
    };
    debug!(path = %file.path, size = stored.size, digest = ?stored.digest, "Checking");

    if stored.size != file.size {
        sink.report(Change::Changed, &file.path)?;
        ctx.record_changed();
        if !persist {
            return Ok(Some(ReconcileCommand::Mark { path }));
        }
        let digest = digest_unless_size_only(file, config, ctx)?;
        return Ok(Some(ReconcileCommand::UpdateAndMark {
            path,
            size: file.size,
            digest,
        }));
    }

    if config.size_only {
        debug!("unchanged: {}", file.path);
        ctx.record_unchanged();
        if stored.digest.is_some() && persist {
            return Ok(Some(ReconcileCommand::UpdateAndMark {
                path,
                size: file.size,
                digest: None,
            }));
        }
        return Ok(Some(ReconcileCommand::Mark { path }));
    }

    let digest = digest(file, config, ctx)?;
    if stored.digest.is_none() {
        warn!(path = %file.path, "Catalog only has the size, compared as changed");
    }

    if stored.digest.as_deref() == Some(digest.as_str()) {
        debug!("unchanged: {}", file.path);
        ctx.record_unchanged();
        return Ok(Some(ReconcileCommand::Mark { path }));
    }

    sink.report(Change::Changed, &file.path)?;
    ctx.record_changed();
    if persist {
        Ok(Some(ReconcileCommand::UpdateAndMark {
            path,
            size: file.size,
            digest: Some(digest),
        }))
    } else {
        Ok(Some(ReconcileCommand::Mark { path }))
    }
}

fn digest_unless_size_only(
    file: &DiscoveredFile,
    config: &ScanConfig,
    ctx: &RunContext,
) -> Result<Option<String>> {
    if config.size_only {
        return Ok(None);
    }
    digest(file, config, ctx).map(Some)
}

fn digest(file: &DiscoveredFile, config: &ScanConfig, ctx: &RunContext) -> Result<String> {
    let digest = checksum_file(&config.root.join(&file.path), file.size)?;
    ctx.record_digested(file.size);
    Ok(digest)
}
