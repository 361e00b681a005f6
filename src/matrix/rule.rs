//! Include/exclude rule matching.
//!
//! A rule maps selector keys to patterns. Keys are dependency names, `python`,
//! or one of the synthetic keys [`ENVIRONMENT_TYPE_KEY`] and
//! [`SYS_PLATFORM_KEY`], which are looked up in the [`AmbientContext`] and
//! never in the candidate itself.
//!
//! A pattern is either a regular expression or `null`. `null` requires the key
//! to be absent. A regular expression requires the key to be present and to
//! match at the start of the value; see [`AnchoredPattern`].

use super::spec::EnvironmentSpec;
use crate::errors::ConfigError;
use std::collections::BTreeMap;
use std::fmt;

/// Synthetic key resolved from the configured backend name
pub const ENVIRONMENT_TYPE_KEY: &str = "environment_type";

/// Synthetic key resolved from the host platform
pub const SYS_PLATFORM_KEY: &str = "sys_platform";

/// A rule as written in configuration: key to pattern, `None` meaning "absent"
pub type RawRule = BTreeMap<String, Option<String>>;

/// Returns true for keys taken from the ambient context
#[must_use]
pub fn is_synthetic_key(key: &str) -> bool {
    key == ENVIRONMENT_TYPE_KEY || key == SYS_PLATFORM_KEY
}

/// Values for the synthetic selector keys of the current run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmbientContext {
    /// Configured backend name, e.g. `virtualenv`
    pub environment_type: Option<String>,
    /// Platform name in the conventional spelling (`linux`, `darwin`, `win32`)
    pub sys_platform: Option<String>,
}

impl AmbientContext {
    /// Creates a context with explicit values
    #[must_use]
    pub fn new(environment_type: impl Into<String>, sys_platform: impl Into<String>) -> Self {
        Self {
            environment_type: Some(environment_type.into()),
            sys_platform: Some(sys_platform.into()),
        }
    }

    /// Context for the host this binary was compiled for
    #[must_use]
    pub fn current(environment_type: impl Into<String>) -> Self {
        Self::new(environment_type, host_platform())
    }

    /// Looks up a synthetic key. Returns `None` for non-synthetic keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        match key {
            ENVIRONMENT_TYPE_KEY => Some(self.environment_type.as_deref()),
            SYS_PLATFORM_KEY => Some(self.sys_platform.as_deref()),
            _ => None,
        }
    }
}

/// Platform name as interpreters report it
#[must_use]
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Regular expression matched at the start of a value only.
///
/// `1.2` matches `1.2.3` (prefix) and `(?!2.6).*` matches every value that
/// does not start with `2.6`. The value does not have to be consumed
/// completely. Lookaround is supported.
#[derive(Debug, Clone)]
pub struct AnchoredPattern {
    source: String,
    regex: fancy_regex::Regex,
}

impl AnchoredPattern {
    /// Compiles `pattern`, anchoring it at the start of input
    pub fn new(pattern: &str) -> Result<Self, fancy_regex::Error> {
        let regex = fancy_regex::Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Pattern as written in configuration
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern matches at position 0 of `value`
    #[must_use]
    pub fn matches_prefix(&self, value: &str) -> bool {
        match self.regex.is_match(value) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(
                    pattern = %self.source,
                    value,
                    error = %e,
                    "Pattern evaluation failed, treating as no match"
                );
                false
            }
        }
    }
}

impl PartialEq for AnchoredPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for AnchoredPattern {}

/// Condition on a single selector key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// The key must not be present
    Absent,
    /// The key must be present and match
    Regex(AnchoredPattern),
}

impl Pattern {
    fn holds(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Absent, value) => value.is_none(),
            (Self::Regex(_), None) => false,
            (Self::Regex(pattern), Some(value)) => pattern.matches_prefix(value),
        }
    }
}

/// A compiled rule: every condition must hold for the rule to match
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rule {
    conditions: Vec<(String, Pattern)>,
}

impl Rule {
    /// Compiles a raw rule. Fails on the first invalid regular expression.
    pub fn compile(raw: &RawRule) -> Result<Self, ConfigError> {
        let conditions = raw
            .iter()
            .map(|(key, pattern)| -> Result<(String, Pattern), ConfigError> {
                let pattern = match pattern {
                    None => Pattern::Absent,
                    Some(source) => Pattern::Regex(AnchoredPattern::new(source).map_err(|e| {
                        ConfigError::InvalidPattern {
                            key: key.clone(),
                            pattern: source.clone(),
                            reason: e.to_string(),
                        }
                    })?),
                };
                Ok((key.clone(), pattern))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { conditions })
    }

    /// Number of conditions
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True for the rule that matches everything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the rule against a candidate.
    ///
    /// Synthetic keys read from `ambient`, all other keys from `candidate`.
    #[must_use]
    pub fn matches(&self, candidate: &EnvironmentSpec, ambient: &AmbientContext) -> bool {
        self.conditions.iter().all(|(key, pattern)| {
            let value = match ambient.get(key) {
                Some(ambient_value) => ambient_value,
                None => candidate.get(key),
            };
            pattern.holds(value)
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, pattern)) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match pattern {
                Pattern::Absent => write!(f, "{key}: null")?,
                Pattern::Regex(p) => write!(f, "{key}: {:?}", p.as_str())?,
            }
        }
        write!(f, "}}")
    }
}
