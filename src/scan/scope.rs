//! Scan scopes
//!
//! A scope is a slash-separated prefix relative to the root. It limits both
//! which part of the tree is walked and which catalog entries may be swept
//! as deleted. The empty scope covers the whole tree.

use crate::error::ConfigError;
use std::fmt;

/// A validated scan scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(String);

impl Scope {
    /// The whole tree
    pub fn root() -> Self {
        Scope(String::new())
    }

    /// Validate and clean a user-supplied scope
    ///
    /// A trailing separator is rejected. Otherwise `.` and empty components
    /// are dropped and `..` is resolved lexically without escaping the root.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.ends_with('/') {
            return Err(ConfigError::InvalidScope {
                scope: raw.to_string(),
                reason: "trailing separator".into(),
            });
        }
        if raw.contains('\0') {
            return Err(ConfigError::InvalidScope {
                scope: raw.to_string(),
                reason: "contains a NUL byte".into(),
            });
        }
        Ok(Scope(clean_path(raw)))
    }

    /// True for the whole-tree scope
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The prefix as stored in the catalog
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `other` lies at or below this scope
    pub fn contains(&self, other: &Scope) -> bool {
        self.is_root()
            || other.0 == self.0
            || (other.0.starts_with(&self.0) && other.0.as_bytes().get(self.0.len()) == Some(&b'/'))
    }

    /// Reject scope lists whose members cover the same catalog entries
    pub fn check_disjoint(scopes: &[Scope]) -> Result<(), ConfigError> {
        for (i, first) in scopes.iter().enumerate() {
            for second in &scopes[i + 1..] {
                if first.contains(second) || second.contains(first) {
                    return Err(ConfigError::OverlappingScopes {
                        first: first.to_string(),
                        second: second.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Lexically clean a relative slash-separated path
fn clean_path(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cleans_components() {
        assert_eq!(Scope::parse("a/b").unwrap().as_str(), "a/b");
        assert_eq!(Scope::parse("./a//b/.").unwrap().as_str(), "a/b");
        assert_eq!(Scope::parse("/a/b").unwrap().as_str(), "a/b");
        assert_eq!(Scope::parse("a/../b").unwrap().as_str(), "b");
        assert_eq!(Scope::parse("../../a").unwrap().as_str(), "a");
        assert!(Scope::parse(".").unwrap().is_root());
        assert!(Scope::parse("a/..").unwrap().is_root());
    }

    #[test]
    fn test_parse_rejects_trailing_separator() {
        let err = Scope::parse("ab/").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScope { .. }));
        assert!(Scope::parse("/").is_err());
    }

    #[test]
    fn test_contains() {
        let ab = Scope::parse("ab").unwrap();
        assert!(ab.contains(&Scope::parse("ab").unwrap()));
        assert!(ab.contains(&Scope::parse("ab/x").unwrap()));
        assert!(!ab.contains(&Scope::parse("abc").unwrap()));
        assert!(Scope::root().contains(&ab));
    }

    #[test]
    fn test_check_disjoint() {
        let ok = vec![Scope::parse("a/b/c").unwrap(), Scope::parse("a/b/d").unwrap()];
        assert!(Scope::check_disjoint(&ok).is_ok());

        let nested = vec![Scope::parse("a/b").unwrap(), Scope::parse("a/b/c").unwrap()];
        assert!(matches!(
            Scope::check_disjoint(&nested),
            Err(ConfigError::OverlappingScopes { .. })
        ));

        let with_root = vec![Scope::parse("a").unwrap(), Scope::root()];
        assert!(Scope::check_disjoint(&with_root).is_err());

        let dup = vec![Scope::parse("a").unwrap(), Scope::parse("./a").unwrap()];
        assert!(Scope::check_disjoint(&dup).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Scope::root().to_string(), ".");
        assert_eq!(Scope::parse("a/b").unwrap().to_string(), "a/b");
    }
}
