//! Resolved environment specifications.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Selector key holding the interpreter version
pub const PYTHON_KEY: &str = "python";

/// One resolved environment: an interpreter version plus the selected
/// dependency versions.
///
/// An empty version string means "install the default version". A dependency
/// that is not installed has no entry at all, which is distinct from an entry
/// holding `""`.
///
/// Equality, ordering and hashing are by value; key order never matters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Interpreter version
    pub python: String,
    /// Dependency name to version
    #[serde(flatten)]
    pub requirements: BTreeMap<String, String>,
}

impl EnvironmentSpec {
    /// Creates a specification with no dependencies
    #[must_use]
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            requirements: BTreeMap::new(),
        }
    }

    /// Adds a dependency at the given version
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.requirements.insert(name.into(), version.into());
        self
    }

    /// Looks up a selector key: `python` or a dependency name
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == PYTHON_KEY {
            Some(&self.python)
        } else {
            self.requirements.get(key).map(String::as_str)
        }
    }

    /// Iterates over all key/value pairs sorted by key, `python` included
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .requirements
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.push((PYTHON_KEY, self.python.as_str()));
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
        pairs.into_iter()
    }
}

impl fmt::Display for EnvironmentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.pairs().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value:?}")?;
        }
        write!(f, "}}")
    }
}
