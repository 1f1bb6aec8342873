//! Catalog operations
//!
//! Every function takes a plain `&Connection` so it works both on a
//! classifier's read connection (outside any transaction) and on the
//! reconciler's open transaction, which derefs to its connection.
//!
//! Prefix-scoped operations match a row when its path equals the prefix or
//! lies below `prefix/`. An empty prefix selects the whole catalog. The
//! prefix is matched with `GLOB` after escaping its metacharacters, so
//! `ab` never matches `abc` and `a*` never matches `ab/x`.

use crate::error::{CatalogError, CatalogResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Slash-separated path relative to the scanned root
    pub path: String,

    /// Byte length at last observation
    pub size: u64,

    /// Content digest, absent in size-only mode
    pub digest: Option<String>,

    /// Re-observed during the current run
    pub visited: bool,
}

impl CatalogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            size: row.get::<_, i64>(1)? as u64,
            digest: row.get(2)?,
            visited: row.get(3)?,
        })
    }
}

/// Which rows a prefix-scoped statement touches
#[derive(Debug, Clone, Copy)]
enum PathRange<'a> {
    /// Whole catalog
    All,
    /// The prefix itself and everything below it
    Subtree(&'a str),
    /// Only rows strictly below the prefix
    Below(&'a str),
}

impl<'a> PathRange<'a> {
    fn subtree(prefix: &'a str) -> Self {
        if prefix.is_empty() {
            PathRange::All
        } else {
            PathRange::Subtree(prefix)
        }
    }

    fn below(prefix: &'a str) -> Self {
        if prefix.is_empty() {
            PathRange::All
        } else {
            PathRange::Below(prefix)
        }
    }

    /// SQL condition appended after the visited predicate
    fn clause(&self) -> &'static str {
        match self {
            PathRange::All => "",
            PathRange::Subtree(_) => " AND (path = ?1 OR path GLOB ?2)",
            PathRange::Below(_) => " AND path GLOB ?1",
        }
    }

    fn bindings(&self) -> Vec<String> {
        match self {
            PathRange::All => Vec::new(),
            PathRange::Subtree(prefix) => vec![prefix.to_string(), descendant_glob(prefix)],
            PathRange::Below(prefix) => vec![descendant_glob(prefix)],
        }
    }
}

/// Escape a literal for use inside a GLOB pattern
///
/// `*`, `?` and `[` are wrapped in single-character classes. A lone `]` is
/// literal in GLOB and needs no escaping.
pub fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len() + 8);
    for ch in literal.chars() {
        match ch {
            '*' | '?' | '[' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn descendant_glob(prefix: &str) -> String {
    format!("{}/*", escape_glob(prefix))
}

fn expect_rows(op: &'static str, path: &str, expected: u64, actual: usize) -> CatalogResult<()> {
    if actual as u64 != expected {
        return Err(CatalogError::RowCount {
            op,
            path: path.to_string(),
            expected,
            actual: actual as u64,
        });
    }
    Ok(())
}

/// Point lookup by exact path
pub fn lookup(conn: &Connection, path: &str) -> CatalogResult<Option<CatalogEntry>> {
    let mut stmt =
        conn.prepare_cached("SELECT path, size, checksum, visited FROM files WHERE path = ?1")?;
    let entry = stmt
        .query_row(params![path], CatalogEntry::from_row)
        .optional()?;
    Ok(entry)
}

/// Insert a new row, marked visited
pub fn insert(conn: &Connection, path: &str, size: u64, digest: Option<&str>) -> CatalogResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO files (path, size, checksum, visited) VALUES (?1, ?2, ?3, 1)",
    )?;
    let rows = stmt.execute(params![path, size as i64, digest])?;
    expect_rows("insert", path, 1, rows)
}

/// Overwrite size and digest of an existing row and mark it visited
pub fn update_and_mark(
    conn: &Connection,
    path: &str,
    size: u64,
    digest: Option<&str>,
) -> CatalogResult<()> {
    let mut stmt = conn
        .prepare_cached("UPDATE files SET size = ?1, checksum = ?2, visited = 1 WHERE path = ?3")?;
    let rows = stmt.execute(params![size as i64, digest, path])?;
    expect_rows("update", path, 1, rows)
}

/// Mark an unvisited row as visited
///
/// Marking a row that is already visited means the same path was
/// classified twice in one run, and fails like a missing row does.
pub fn mark(conn: &Connection, path: &str) -> CatalogResult<()> {
    let mut stmt =
        conn.prepare_cached("UPDATE files SET visited = 1 WHERE path = ?1 AND visited = 0")?;
    let rows = stmt.execute(params![path])?;
    expect_rows("mark", path, 1, rows)
}

fn select_unvisited(conn: &Connection, range: PathRange<'_>) -> CatalogResult<Vec<CatalogEntry>> {
    let sql = format!(
        "SELECT path, size, checksum, visited FROM files WHERE visited = 0{} ORDER BY path ASC",
        range.clause()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let entries = stmt
        .query_map(params_from_iter(range.bindings()), CatalogEntry::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Unvisited rows at `prefix` or below it, ordered by path
pub fn query_unvisited(conn: &Connection, prefix: &str) -> CatalogResult<Vec<CatalogEntry>> {
    select_unvisited(conn, PathRange::subtree(prefix))
}

/// Unvisited rows strictly below `prefix/`, ordered by path
pub fn query_unvisited_below(conn: &Connection, prefix: &str) -> CatalogResult<Vec<CatalogEntry>> {
    select_unvisited(conn, PathRange::below(prefix))
}

/// Delete unvisited rows at `prefix` or below it, returning the count
pub fn delete_unvisited(conn: &Connection, prefix: &str) -> CatalogResult<u64> {
    let range = PathRange::subtree(prefix);
    let sql = format!("DELETE FROM files WHERE visited = 0{}", range.clause());
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.execute(params_from_iter(range.bindings()))?;
    Ok(rows as u64)
}

/// Reset visited rows at `prefix` or below it, returning the count
pub fn clear_visited_flags(conn: &Connection, prefix: &str) -> CatalogResult<u64> {
    let range = PathRange::subtree(prefix);
    let sql = format!("UPDATE files SET visited = 0 WHERE visited = 1{}", range.clause());
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.execute(params_from_iter(range.bindings()))?;
    Ok(rows as u64)
}

/// Reset the visited flag of a single row
pub fn clear_visited_flag(conn: &Connection, path: &str) -> CatalogResult<()> {
    let mut stmt =
        conn.prepare_cached("UPDATE files SET visited = 0 WHERE path = ?1 AND visited = 1")?;
    let rows = stmt.execute(params![path])?;
    expect_rows("clear visited", path, 1, rows)
}

/// All rows ordered by path
pub fn entries(conn: &Connection) -> CatalogResult<Vec<CatalogEntry>> {
    let mut stmt =
        conn.prepare_cached("SELECT path, size, checksum, visited FROM files ORDER BY path ASC")?;
    let entries = stmt
        .query_map([], CatalogEntry::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_schema;

    fn catalog_with(rows: &[(&str, u64, Option<&str>, bool)]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        for (path, size, digest, visited) in rows {
            conn.execute(
                "INSERT INTO files (path, size, checksum, visited) VALUES (?1, ?2, ?3, ?4)",
                params![path, *size as i64, digest, visited],
            )
            .unwrap();
        }
        conn
    }

    fn paths(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("plain/path"), "plain/path");
        assert_eq!(escape_glob("a*b?c"), "a[*]b[?]c");
        assert_eq!(escape_glob("[x]"), "[[]x]");
        assert_eq!(escape_glob("100%_done"), "100%_done");
    }

    #[test]
    fn test_lookup() {
        let conn = catalog_with(&[("a", 5, Some("d1"), false), ("b", 7, None, true)]);

        let a = lookup(&conn, "a").unwrap().unwrap();
        assert_eq!(a.size, 5);
        assert_eq!(a.digest.as_deref(), Some("d1"));
        assert!(!a.visited);

        let b = lookup(&conn, "b").unwrap().unwrap();
        assert_eq!(b.digest, None);
        assert!(b.visited);

        assert!(lookup(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_insert() {
        let conn = catalog_with(&[("a", 5, None, false)]);

        insert(&conn, "b", 3, Some("d2")).unwrap();
        let b = lookup(&conn, "b").unwrap().unwrap();
        assert_eq!(b.size, 3);
        assert_eq!(b.digest.as_deref(), Some("d2"));
        assert!(b.visited);

        // Existing path violates the primary key
        assert!(insert(&conn, "a", 1, None).is_err());
    }

    #[test]
    fn test_update_and_mark() {
        let conn = catalog_with(&[("a", 5, Some("d1"), false)]);

        update_and_mark(&conn, "a", 9, None).unwrap();
        let a = lookup(&conn, "a").unwrap().unwrap();
        assert_eq!(a.size, 9);
        assert_eq!(a.digest, None);
        assert!(a.visited);

        let err = update_and_mark(&conn, "missing", 1, None).unwrap_err();
        assert!(matches!(err, CatalogError::RowCount { actual: 0, .. }));
    }

    #[test]
    fn test_mark_rejects_visited_rows() {
        let conn = catalog_with(&[("a", 5, None, false)]);

        mark(&conn, "a").unwrap();
        assert!(lookup(&conn, "a").unwrap().unwrap().visited);

        // Second mark in the same run is a duplicate classification
        let err = mark(&conn, "a").unwrap_err();
        assert!(matches!(err, CatalogError::RowCount { op: "mark", .. }));

        assert!(mark(&conn, "missing").is_err());
    }

    #[test]
    fn test_query_unvisited_respects_separator_boundary() {
        let conn = catalog_with(&[
            ("ab", 1, None, false),
            ("ab/x", 1, None, false),
            ("ab/y", 1, None, true),
            ("abc", 1, None, false),
            ("ab.txt", 1, None, false),
        ]);

        let subtree = query_unvisited(&conn, "ab").unwrap();
        assert_eq!(paths(&subtree), vec!["ab", "ab/x"]);

        let below = query_unvisited_below(&conn, "ab").unwrap();
        assert_eq!(paths(&below), vec!["ab/x"]);

        let all = query_unvisited(&conn, "").unwrap();
        assert_eq!(paths(&all), vec!["ab", "ab.txt", "ab/x", "abc"]);
    }

    #[test]
    fn test_prefix_metacharacters_are_literal() {
        let conn = catalog_with(&[
            ("a*", 1, None, false),
            ("a*/x", 1, None, false),
            ("ab/x", 1, None, false),
            ("a?/y", 1, None, false),
            ("[d]/z", 1, None, false),
            ("d/z", 1, None, false),
        ]);

        assert_eq!(paths(&query_unvisited(&conn, "a*").unwrap()), vec!["a*", "a*/x"]);
        assert_eq!(paths(&query_unvisited(&conn, "a?").unwrap()), vec!["a?/y"]);
        assert_eq!(paths(&query_unvisited(&conn, "[d]").unwrap()), vec!["[d]/z"]);
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        let conn = catalog_with(&[("AB/x", 1, None, false), ("ab/x", 1, None, false)]);
        assert_eq!(paths(&query_unvisited(&conn, "ab").unwrap()), vec!["ab/x"]);
    }

    #[test]
    fn test_delete_unvisited() {
        let conn = catalog_with(&[
            ("ab", 1, None, false),
            ("ab/x", 1, None, false),
            ("ab/y", 1, None, true),
            ("abc", 1, None, false),
        ]);

        assert_eq!(delete_unvisited(&conn, "ab").unwrap(), 2);
        assert_eq!(paths(&entries(&conn).unwrap()), vec!["ab/y", "abc"]);

        assert_eq!(delete_unvisited(&conn, "").unwrap(), 1);
        assert_eq!(paths(&entries(&conn).unwrap()), vec!["ab/y"]);
    }

    #[test]
    fn test_clear_visited_flags() {
        let conn = catalog_with(&[
            ("ab", 1, None, true),
            ("ab/x", 1, None, true),
            ("ab/y", 1, None, false),
            ("abc", 1, None, true),
        ]);

        assert_eq!(clear_visited_flags(&conn, "ab").unwrap(), 2);
        assert!(lookup(&conn, "abc").unwrap().unwrap().visited);

        assert_eq!(clear_visited_flags(&conn, "").unwrap(), 1);
        assert!(entries(&conn).unwrap().iter().all(|e| !e.visited));
    }

    #[test]
    fn test_clear_visited_flag() {
        let conn = catalog_with(&[("ab", 1, None, true), ("ab/x", 1, None, true)]);

        clear_visited_flag(&conn, "ab").unwrap();
        assert!(!lookup(&conn, "ab").unwrap().unwrap().visited);
        assert!(lookup(&conn, "ab/x").unwrap().unwrap().visited);

        assert!(clear_visited_flag(&conn, "ab").is_err());
    }
}
