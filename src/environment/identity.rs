//! Stable identifiers for provisioned environments

use crate::matrix::EnvironmentSpec;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex characters kept from the digest
const ID_LEN: usize = 16;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static pattern is valid"));

/// Identity of an environment: a short hash used as directory name plus a
/// readable name for logs.
///
/// The hash covers the backend name and every key/value pair of the
/// specification sorted by key, so value-equal specifications always map to
/// the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentIdentity {
    id: String,
    name: String,
}

impl EnvironmentIdentity {
    /// Derives the identity of `spec` provisioned by `backend`
    #[must_use]
    pub fn new(spec: &EnvironmentSpec, backend: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(backend.as_bytes());
        hasher.update([0u8]);
        for (key, value) in spec.pairs() {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());

        Self {
            id: digest[..ID_LEN].to_string(),
            name: readable_name(spec, backend),
        }
    }

    /// Short hexadecimal identifier, safe as a directory name
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name, e.g. `virtualenv-py2.7-six1.4`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for EnvironmentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

fn readable_name(spec: &EnvironmentSpec, backend: &str) -> String {
    let mut name = format!("{backend}-py{}", spec.python);
    for (dependency, version) in &spec.requirements {
        name.push('-');
        name.push_str(dependency);
        name.push_str(version);
    }
    UNSAFE_CHARS.replace_all(&name, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_equal_specs_share_identity() {
        let a = EnvironmentSpec::new("2.7").with("six", "1.4").with("colorama", "");
        let b = EnvironmentSpec::new("2.7").with("colorama", "").with("six", "1.4");

        assert_eq!(
            EnvironmentIdentity::new(&a, "virtualenv"),
            EnvironmentIdentity::new(&b, "virtualenv")
        );
    }

    #[test]
    fn test_backend_changes_identity() {
        let spec = EnvironmentSpec::new("2.7");
        assert_ne!(
            EnvironmentIdentity::new(&spec, "virtualenv").id(),
            EnvironmentIdentity::new(&spec, "conda").id()
        );
    }

    #[test]
    fn test_absent_and_default_differ() {
        let absent = EnvironmentSpec::new("2.7");
        let default = EnvironmentSpec::new("2.7").with("six", "");
        assert_ne!(
            EnvironmentIdentity::new(&absent, "conda").id(),
            EnvironmentIdentity::new(&default, "conda").id()
        );
    }

    #[test]
    fn test_key_value_boundaries_are_unambiguous() {
        let a = EnvironmentSpec::new("2.7").with("ab", "1");
        let b = EnvironmentSpec::new("2.7").with("a", "b1");
        assert_ne!(
            EnvironmentIdentity::new(&a, "conda").id(),
            EnvironmentIdentity::new(&b, "conda").id()
        );
    }

    #[test]
    fn test_id_is_short_hex() {
        let identity = EnvironmentIdentity::new(&EnvironmentSpec::new("3.4"), "conda");
        assert_eq!(identity.id().len(), ID_LEN);
        assert!(identity.id().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_readable_name() {
        let spec = EnvironmentSpec::new("2.7")
            .with("six", "1.4")
            .with("colorama", "")
            .with("odd/name", ">=1");
        let identity = EnvironmentIdentity::new(&spec, "virtualenv");
        assert_eq!(
            identity.name(),
            "virtualenv-py2.7-colorama-odd_name_1-six1.4"
        );
    }
}
