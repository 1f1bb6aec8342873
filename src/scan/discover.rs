//! Local filesystem discovery
//!
//! Produces the lazy `(relative path, size)` sequence the classifiers
//! consume. Only regular files are emitted; symlinks below the scope root
//! and special files are skipped. Relative paths always use `/`.

use crate::config::PathFilter;
use crate::error::{Result, WalkError};
use crate::scan::Scope;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Slash-separated path relative to the root
    pub path: String,

    /// Size in bytes at discovery time
    pub size: u64,
}

impl DiscoveredFile {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Walks scopes below a root directory
#[derive(Debug, Clone)]
pub struct LocalWalker {
    root: PathBuf,
    filter: PathFilter,
}

impl LocalWalker {
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    /// Lazily walk one scope
    ///
    /// A scope naming a file yields just that file. A scope that does not
    /// exist yields nothing, so its catalog entries get swept as deleted.
    pub fn walk(&self, scope: &Scope) -> ScopeWalk<'_> {
        let start = if scope.is_root() {
            self.root.clone()
        } else {
            self.root.join(scope.as_str())
        };

        let inner = match fs::metadata(&start) {
            Ok(_) => Some(
                WalkDir::new(&start)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            ),
            Err(e) => {
                warn!(scope = %scope, error = %e, "Scope not found in tree, skipped");
                None
            }
        };

        debug!(root = %self.root.display(), scope = %scope, "Walking scope");
        ScopeWalk {
            walker: self,
            inner,
        }
    }

    /// Walk several scopes one after another
    pub fn walk_all<'a>(
        &'a self,
        scopes: &'a [Scope],
    ) -> impl Iterator<Item = Result<DiscoveredFile>> + 'a {
        scopes.iter().flat_map(move |scope| self.walk(scope))
    }

    fn relative_path(&self, path: &Path) -> Result<String> {
        let rel = path.strip_prefix(&self.root).map_err(|_| WalkError::Traverse {
            path: path.to_path_buf(),
            reason: "outside of root".into(),
        })?;

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| WalkError::NonUtf8 {
                        path: path.to_path_buf(),
                    })?;
                    parts.push(name);
                }
                Component::CurDir => {}
                _ => {
                    return Err(WalkError::Traverse {
                        path: path.to_path_buf(),
                        reason: "unexpected path component".into(),
                    }
                    .into())
                }
            }
        }
        Ok(parts.join("/"))
    }
}

/// Iterator over the files of one scope
pub struct ScopeWalk<'a> {
    walker: &'a LocalWalker,
    inner: Option<walkdir::IntoIter>,
}

impl ScopeWalk<'_> {
    fn fail(&mut self, err: crate::error::ScanError) -> Option<Result<DiscoveredFile>> {
        self.inner = None;
        Some(Err(err))
    }
}

impl Iterator for ScopeWalk<'_> {
    type Item = Result<DiscoveredFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.as_mut()?.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.walker.root.clone());
                    return self.fail(
                        WalkError::Traverse {
                            path,
                            reason: e.to_string(),
                        }
                        .into(),
                    );
                }
            };

            let file_type = entry.file_type();
            if !file_type.is_file() {
                if !file_type.is_dir() {
                    debug!(path = %entry.path().display(), "Not a regular file, ignored");
                }
                continue;
            }

            let rel = match self.walker.relative_path(entry.path()) {
                Ok(rel) => rel,
                Err(e) => return self.fail(e),
            };

            if self.walker.filter.should_skip(&rel) {
                info!("skipped: {}", rel);
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    return self.fail(
                        WalkError::Traverse {
                            path: entry.path().to_path_buf(),
                            reason: e.to_string(),
                        }
                        .into(),
                    )
                }
            };

            return Some(Ok(DiscoveredFile { path: rel, size }));
        }
    }
}
