//! Scan coordinator - orchestrates one change detection run
//!
//! The coordinator is responsible for:
//! - Opening the catalog and spawning the reconciler
//! - Spawning the classifier pool
//! - Feeding discovered files to the pool
//! - Closing the stages in order and sending one sweep per scope
//! - Picking the root-cause error when a stage fails

use crate::config::ScanConfig;
use crate::db::{schema, ReconcileCommand, Reconciler};
use crate::error::{Result, ScanError, WorkerError};
use crate::progress::ProgressReporter;
use crate::scan::{Classifier, DiscoveredFile, LocalWalker, ResultSink, RunContext, RunSummary};
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Files fed between progress refreshes
const PROGRESS_INTERVAL: u64 = 64;

/// Coordinates discovery, the classifier pool and the reconciler
pub struct ScanCoordinator {
    /// Configuration
    config: Arc<ScanConfig>,

    /// Result stream shared by classifiers and reconciler
    sink: ResultSink,

    /// Counters and abort flag
    ctx: Arc<RunContext>,

    /// Optional progress display
    progress: Option<ProgressReporter>,
}

impl ScanCoordinator {
    pub fn new(config: ScanConfig, sink: ResultSink) -> Self {
        Self {
            config: Arc::new(config),
            sink,
            ctx: Arc::new(RunContext::new()),
            progress: None,
        }
    }

    /// Attach a progress display, refreshed while files are fed
    pub fn with_progress(mut self, progress: Option<ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// The run's shared context
    pub fn context(&self) -> Arc<RunContext> {
        Arc::clone(&self.ctx)
    }

    /// Walk the configured scopes below the root and reconcile them
    pub fn run(self) -> Result<RunSummary> {
        let walker = LocalWalker::new(self.config.root.clone(), self.config.filter.clone());
        let scopes = self.config.scopes.clone();
        self.run_with(walker.walk_all(&scopes))
    }

    /// Reconcile an arbitrary discovery sequence against the configured scopes
    ///
    /// Every file in `files` must lie within one of the configured scopes.
    pub fn run_with<I>(self, files: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<DiscoveredFile>>,
    {
        let start = Instant::now();
        let config = &self.config;
        let ctx = &self.ctx;

        info!(
            root = %config.root.display(),
            catalog = %config.catalog_path.display(),
            workers = config.worker_count,
            size_only = config.size_only,
            update = config.persist,
            "Starting scan"
        );

        let conn = schema::open_catalog(&config.catalog_path)?;
        let reconciler = Reconciler::spawn(
            conn,
            config.persist,
            config.queue_size,
            self.sink.clone(),
            Arc::clone(ctx),
        )?;

        let mut failures: Vec<ScanError> = Vec::new();

        // Spawn classifiers
        let (file_tx, file_rx) = bounded(config.worker_count);
        let mut classifiers = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            match Classifier::spawn(
                id,
                Arc::clone(config),
                file_rx.clone(),
                reconciler.sender(),
                self.sink.clone(),
                Arc::clone(ctx),
            ) {
                Ok(classifier) => classifiers.push(classifier),
                Err(e) => {
                    ctx.abort();
                    failures.push(e.into());
                    break;
                }
            }
        }
        drop(file_rx);
        debug!(count = classifiers.len(), "Classifiers spawned");

        // Feed discovered files
        for item in files {
            if ctx.is_aborted() {
                break;
            }
            let file = match item {
                Ok(file) => file,
                Err(e) => {
                    ctx.abort();
                    failures.push(e);
                    break;
                }
            };
            ctx.record_discovered();
            if file_tx.send(file).is_err() {
                // Every classifier has exited
                ctx.abort();
                break;
            }
            self.refresh_progress();
        }
        drop(file_tx);

        for classifier in classifiers {
            if let Err(e) = classifier.join() {
                failures.push(e);
            }
        }

        // All marks are queued ahead of the sweeps
        if !ctx.is_aborted() {
            let commands = reconciler.sender();
            for scope in &config.scopes {
                debug!(scope = %scope, "Sweeping scope");
                if commands
                    .send(ReconcileCommand::SweepScope(scope.clone()))
                    .is_err()
                {
                    failures.push(WorkerError::ReconcilerGone.into());
                    break;
                }
            }
        }

        if let Err(e) = reconciler.finish() {
            failures.push(e);
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        if let Some(err) = root_cause(failures) {
            return Err(err);
        }
        if ctx.is_aborted() {
            return Err(ScanError::Aborted);
        }

        let summary = RunSummary {
            counts: ctx.counts(),
            persisted: config.persist,
            duration: start.elapsed(),
        };
        info!(
            files = summary.counts.classified(),
            duration_secs = summary.duration.as_secs_f64(),
            persisted = summary.persisted,
            "Scan completed"
        );
        Ok(summary)
    }

    fn refresh_progress(&self) {
        if let Some(progress) = &self.progress {
            let counts = self.ctx.counts();
            if counts.files_discovered % PROGRESS_INTERVAL == 0 {
                progress.update(&counts);
            }
        }
    }
}

/// First error that is not a side effect of another stage stopping
fn root_cause(failures: Vec<ScanError>) -> Option<ScanError> {
    let mut secondary = None;
    for err in failures {
        if !err.is_secondary() {
            return Some(err);
        }
        if secondary.is_none() {
            secondary = Some(err);
        }
    }
    secondary
}
