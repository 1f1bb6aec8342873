//! dirsum - Directory Change Detection
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dirsum::config::{CliArgs, ScanConfig};
use dirsum::progress::{mode_label, print_header, print_summary, ProgressReporter};
use dirsum::scan::{ResultSink, ScanCoordinator};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose, args.quiet)?;

    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress && !config.quiet {
        print_header(
            &config.root,
            config.worker_count,
            &config.catalog_path,
            &mode_label(config.size_only, config.persist),
        );
    }

    let progress = if config.show_progress {
        let reporter = ProgressReporter::new();
        reporter.set_status("Opening catalog...");
        Some(reporter)
    } else {
        None
    };

    let catalog_path = config.catalog_path.clone();
    let quiet = config.quiet;

    let summary = ScanCoordinator::new(config, ResultSink::stdout())
        .with_progress(progress)
        .run()
        .context("Scan failed")?;

    if !summary.persisted {
        info!("Dry run, catalog not modified");
    }

    if !quiet {
        print_summary(&summary, &catalog_path);
    }

    Ok(())
}

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("dirsum=debug,warn")
    } else {
        EnvFilter::new("dirsum=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
