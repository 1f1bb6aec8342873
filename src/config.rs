//! Configuration types for dirsum
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - The exclude/include path filter

use crate::error::ConfigError;
use crate::scan::Scope;
use clap::Parser;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Minimum reconciler queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Default catalog file name, placed inside the root
pub const DEFAULT_CATALOG: &str = ".checksum.db";

/// Side files SQLite keeps next to the catalog
const CATALOG_SIDE_FILES: &[&str] = &["-journal", "-wal", "-shm"];

/// Detect changes in a directory tree against a checksum catalog
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dirsum",
    version,
    about = "Detect changes in a directory tree against a checksum catalog",
    long_about = "Computes the checksums of ROOT's files, compares them against the \
                  catalog, and reports new, changed and deleted files. The catalog is \
                  only modified when --update is given.\n\n\
                  Exclude/include patterns are regexes matched against the whole path \
                  relative to ROOT, always using '/' as the separator. A file is skipped \
                  when it matches any --exclude pattern and no --include pattern.",
    after_help = "EXAMPLES:\n    \
        dirsum /data                         # compare only\n    \
        dirsum /data --update                # compare and record\n    \
        dirsum /data photos/2023 --update    # rescan one subtree\n    \
        dirsum /data --size-only -j 1        # sizes only, single reader for HDDs\n    \
        dirsum /data --exclude '.*\\.tmp' --include 'keep/.*'"
)]
pub struct CliArgs {
    /// Root directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Only process paths at or below these prefixes (relative to ROOT, '/' separated)
    #[arg(value_name = "SCOPE")]
    pub scopes: Vec<String>,

    /// Catalog file. A bare file name is placed inside ROOT and excluded from the scan
    #[arg(short = 'c', long, default_value = DEFAULT_CATALOG, value_name = "FILE")]
    pub catalog: PathBuf,

    /// Number of classifier threads reading files in parallel (use 1 on HDDs)
    #[arg(short = 'j', long, default_value_t = default_workers(), value_name = "NUM")]
    pub workers: usize,

    /// Buffered commands between the classifiers and the catalog writer
    #[arg(long, default_value = "128", value_name = "NUM")]
    pub queue_size: usize,

    /// Skip paths matching this regex (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Keep paths matching this regex even if excluded (can be repeated)
    #[arg(long = "include", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Detect changes by file size only, without reading contents
    #[arg(long)]
    pub size_only: bool,

    /// Write the new snapshot to the catalog
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Show a progress spinner on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose logging (per-file decisions)
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors; also hides the run stats line and the summary
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Decides which discovered files never reach the classifiers
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exclude: Vec<Regex>,
    include: Vec<Regex>,
}

impl PathFilter {
    /// Compile exclude and include patterns, each anchored to the full path
    pub fn new(exclude: &[String], include: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            exclude: compile_patterns(exclude)?,
            include: compile_patterns(include)?,
        })
    }

    /// Additionally exclude exact relative paths
    pub fn exclude_literal(&mut self, path: &str) -> Result<(), ConfigError> {
        let re = Regex::new(&format!("^{}$", regex::escape(path))).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.exclude.push(re);
        Ok(())
    }

    /// True when the path matches an exclude pattern and no include pattern
    pub fn should_skip(&self, rel_path: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(rel_path))
            && !self.include.iter().any(|re| re.is_match(rel_path))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p)).map_err(|e| ConfigError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory
    pub root: PathBuf,

    /// Catalog database path
    pub catalog_path: PathBuf,

    /// Number of classifier threads
    pub worker_count: usize,

    /// Capacity of the classifier -> reconciler channel
    pub queue_size: usize,

    /// Disjoint scopes to scan; a single root scope covers the whole tree
    pub scopes: Vec<Scope>,

    /// Exclude/include filter applied during discovery
    pub filter: PathFilter,

    /// Compare sizes only
    pub size_only: bool,

    /// Commit the run's changes to the catalog
    pub persist: bool,

    /// Show progress spinner
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,

    /// Suppress summary and informational logs
    pub quiet: bool,
}

impl ScanConfig {
    /// Defaults for a whole-tree dry run
    pub fn new(root: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog_path: catalog_path.into(),
            worker_count: default_workers(),
            queue_size: 128,
            scopes: vec![Scope::root()],
            filter: PathFilter::default(),
            size_only: false,
            persist: false,
            show_progress: false,
            verbose: false,
            quiet: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        validate_root(&args.root)?;

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: args.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        let mut filter = PathFilter::new(&args.exclude_patterns, &args.include_patterns)?;
        let (catalog_path, inside_root) = resolve_catalog_path(&args.root, &args.catalog)?;
        if let Some(name) = inside_root {
            filter.exclude_literal(&name)?;
            for suffix in CATALOG_SIDE_FILES {
                filter.exclude_literal(&format!("{}{}", name, suffix))?;
            }
        }

        let scopes = if args.scopes.is_empty() {
            vec![Scope::root()]
        } else {
            args.scopes
                .iter()
                .map(|s| Scope::parse(s))
                .collect::<Result<Vec<_>, _>>()?
        };
        Scope::check_disjoint(&scopes)?;

        Ok(Self {
            root: args.root,
            catalog_path,
            worker_count: args.workers,
            queue_size: args.queue_size,
            scopes,
            filter,
            size_only: args.size_only,
            persist: args.update,
            show_progress: args.progress,
            verbose: args.verbose,
            quiet: args.quiet,
        })
    }
}

fn validate_root(root: &Path) -> Result<(), ConfigError> {
    // metadata() follows a symlinked root
    let meta = std::fs::metadata(root).map_err(|e| ConfigError::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(ConfigError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".into(),
        });
    }
    Ok(())
}

/// Resolve the catalog location
///
/// Returns the path to open and, for a bare file name, the name relative to
/// the root so discovery can exclude it.
fn resolve_catalog_path(
    root: &Path,
    catalog: &Path,
) -> Result<(PathBuf, Option<String>), ConfigError> {
    let raw = catalog.to_string_lossy();
    let has_separator = raw.contains('/') || raw.contains(std::path::MAIN_SEPARATOR);
    if has_separator {
        return Ok((catalog.to_path_buf(), None));
    }

    if raw.is_empty() || raw == "." || raw == ".." {
        return Err(ConfigError::InvalidCatalogPath {
            path: catalog.to_path_buf(),
            reason: "not a file name".into(),
        });
    }

    Ok((root.join(catalog), Some(raw.into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(root: &Path, extra: &[&str]) -> CliArgs {
        let mut argv = vec!["dirsum".to_string(), root.display().to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_path_filter() {
        let filter = PathFilter::new(
            &[r".*\.exc".to_string(), "exclude".to_string()],
            &[r"(.*/)?inc[^/]*".to_string()],
        )
        .unwrap();

        assert!(filter.should_skip("file.exc"));
        assert!(filter.should_skip("exclude"));
        assert!(!filter.should_skip("exclude2"));
        assert!(!filter.should_skip("dir1.exc/incfile1.exc"));
        assert!(!filter.should_skip("file1"));
    }

    #[test]
    fn test_path_filter_empty_skips_nothing() {
        let filter = PathFilter::default();
        assert!(!filter.should_skip(""));
        assert!(!filter.should_skip("anything"));
    }

    #[test]
    fn test_exclude_literal_escapes_metacharacters() {
        let mut filter = PathFilter::default();
        filter.exclude_literal("cat.db[1]*").unwrap();

        assert!(filter.should_skip("cat.db[1]*"));
        assert!(!filter.should_skip("catxdb1"));
        assert!(!filter.should_skip("cat.db[1]*-wal"));
    }

    #[test]
    fn test_quiet_help_mentions_stats_line() {
        use clap::CommandFactory;

        let command = CliArgs::command();
        let quiet = command
            .get_arguments()
            .find(|arg| arg.get_id() == "quiet")
            .unwrap();
        let help = quiet.get_help().unwrap().to_string();
        assert!(help.contains("stats line"), "help was: {}", help);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathFilter::new(&["(".to_string()], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_default_catalog_is_excluded() {
        let dir = tempdir().unwrap();
        let config = ScanConfig::from_args(args(dir.path(), &[])).unwrap();

        assert_eq!(config.catalog_path, dir.path().join(DEFAULT_CATALOG));
        assert!(config.filter.should_skip(".checksum.db"));
        assert!(config.filter.should_skip(".checksum.db-journal"));
        assert!(config.filter.should_skip(".checksum.db-wal"));
        assert!(!config.filter.should_skip("sub/.checksum.db"));
        assert!(!config.filter.should_skip("xchecksumxdb"));
        assert_eq!(config.scopes, vec![Scope::root()]);
        assert!(!config.persist);
    }

    #[test]
    fn test_catalog_with_separator_is_not_excluded() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("elsewhere.db");
        let catalog_arg = catalog.display().to_string();
        let config =
            ScanConfig::from_args(args(dir.path(), &["--catalog", &catalog_arg])).unwrap();

        assert_eq!(config.catalog_path, catalog);
        assert!(!config.filter.should_skip("elsewhere.db"));
    }

    #[test]
    fn test_invalid_worker_count() {
        let dir = tempdir().unwrap();
        let err = ScanConfig::from_args(args(dir.path(), &["-j", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkerCount { .. }));
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        let err = ScanConfig::from_args(args(&file, &[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoot { .. }));

        let err = ScanConfig::from_args(args(&dir.path().join("missing"), &[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoot { .. }));
    }

    #[test]
    fn test_scopes() {
        let dir = tempdir().unwrap();
        let config =
            ScanConfig::from_args(args(dir.path(), &["a/b", "./c", "--update"])).unwrap();
        assert_eq!(
            config.scopes,
            vec![Scope::parse("a/b").unwrap(), Scope::parse("c").unwrap()]
        );
        assert!(config.persist);

        let err = ScanConfig::from_args(args(dir.path(), &["a/"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScope { .. }));

        let err = ScanConfig::from_args(args(dir.path(), &["a", "a/b"])).unwrap_err();
        assert!(matches!(err, ConfigError::OverlappingScopes { .. }));
    }
}
