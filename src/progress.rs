//! Progress reporting for dirsum
//!
//! Provides a live spinner using indicatif, plus the run header and summary.
//! Everything here writes to stderr; stdout carries the result stream.

use crate::scan::{RunCounts, RunSummary};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, counts: &RunCounts) {
        let msg = format!(
            "Files: {} | New: {} | Changed: {} | Unchanged: {} | Digested: {}",
            format_number(counts.files_discovered),
            format_number(counts.new),
            format_number(counts.changed),
            format_number(counts.unchanged),
            format_size(counts.bytes_digested, BINARY),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Mode line shown in the header
pub fn mode_label(size_only: bool, persist: bool) -> String {
    let compare = if size_only { "size only" } else { "size + md5" };
    let write = if persist { "update" } else { "dry run" };
    format!("{}, {}", compare, write)
}

/// Print a header at the start of the scan
pub fn print_header(root: &Path, workers: usize, catalog: &Path, mode: &str) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("dirsum").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Root:").bold(), root.display());
    eprintln!("  {} {}", style("Catalog:").bold(), catalog.display());
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!("  {} {}", style("Mode:").bold(), mode);
    eprintln!();
}

/// Print a summary of the run
pub fn print_summary(summary: &RunSummary, catalog: &Path) {
    let counts = &summary.counts;

    eprintln!();
    if summary.persisted {
        eprintln!("{}", style("Catalog Updated").green().bold());
    } else {
        eprintln!("{}", style("Dry Run Complete").green().bold());
    }
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("New:").bold(), format_number(counts.new));
    eprintln!(
        "  {} {}",
        style("Changed:").bold(),
        format_number(counts.changed)
    );
    eprintln!(
        "  {} {}",
        style("Deleted:").bold(),
        format_number(counts.deleted)
    );
    eprintln!(
        "  {} {}",
        style("Unchanged:").bold(),
        format_number(counts.unchanged)
    );
    eprintln!(
        "  {} {}",
        style("Digested:").bold(),
        format_size(counts.bytes_digested, BINARY)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        summary.duration.as_secs_f64(),
        summary.files_per_second()
    );

    match std::fs::metadata(catalog) {
        Ok(meta) => eprintln!(
            "  {} {} ({})",
            style("Catalog:").bold(),
            catalog.display(),
            format_size(meta.len(), BINARY)
        ),
        Err(_) => eprintln!("  {} {}", style("Catalog:").bold(), catalog.display()),
    }
    if !summary.persisted && summary.has_changes() {
        eprintln!(
            "  {}",
            style("Run with --update to record these changes").yellow()
        );
    }
    eprintln!();
}
