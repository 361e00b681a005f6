//! Requirement matrix entries.
//!
//! Configuration files describe each dependency with one of several shapes:
//!
//! | YAML value        | Meaning                               |
//! |-------------------|---------------------------------------|
//! | `null`            | do not install                        |
//! | `""`              | install the installer's default       |
//! | `"1.4"`           | install exactly this version          |
//! | `["1.4", null]`   | one environment per listed variant    |
//! | `[]`              | no versions to test, dependency dropped |
//!
//! These shapes are converted into [`Requirement`] as soon as they are
//! deserialized so that the resolver never has to guess. Versions must be
//! quoted: unquoted numbers are rejected, see [`super::version`].

use super::version::RequirementVisitor;
use serde::{Deserialize, Deserializer, Serialize};

/// A single choice for one dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The dependency is not part of the environment
    Omit,
    /// Installed at the installer's default version
    Default,
    /// Installed at a fixed version
    Fixed(String),
}

impl Variant {
    /// Version string this variant contributes, `None` when omitted
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Omit => None,
            Self::Default => Some(""),
            Self::Fixed(version) => Some(version),
        }
    }
}

impl From<Option<String>> for Variant {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::Omit,
            Some(v) if v.is_empty() => Self::Default,
            Some(v) => Self::Fixed(v),
        }
    }
}

impl From<Variant> for Option<String> {
    fn from(variant: Variant) -> Self {
        variant.version().map(str::to_string)
    }
}

/// Versions to test for one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "RawRequirement")]
pub enum Requirement {
    /// Never installed
    Omit,
    /// Installed at the default version
    Default,
    /// Installed at exactly one version
    Fixed(String),
    /// Crossed with the rest of the matrix, one environment per variant
    OneOf(Vec<Variant>),
}

impl Requirement {
    /// Creates a `OneOf` from fixed version strings
    #[must_use]
    pub fn one_of<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(
            versions
                .into_iter()
                .map(|v| Variant::from(Some(v.into())))
                .collect(),
        )
    }

    /// Variants this entry contributes to the cartesian product.
    ///
    /// Never empty: an omitted dependency or an empty list contributes a
    /// single [`Variant::Omit`], so it multiplies the matrix by one and adds
    /// no key.
    #[must_use]
    pub fn variants(&self) -> Vec<Variant> {
        match self {
            Self::Omit => vec![Variant::Omit],
            Self::Default => vec![Variant::Default],
            Self::Fixed(version) => vec![Variant::Fixed(version.clone())],
            Self::OneOf(variants) if variants.is_empty() => vec![Variant::Omit],
            Self::OneOf(variants) => variants.clone(),
        }
    }
}

impl From<Variant> for Requirement {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Omit => Self::Omit,
            Variant::Default => Self::Default,
            Variant::Fixed(version) => Self::Fixed(version),
        }
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RequirementVisitor { key: None })
    }
}

/// Configuration shape written back on serialization
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum RawRequirement {
    List(Vec<Option<String>>),
    Scalar(Option<String>),
}

impl From<Requirement> for RawRequirement {
    fn from(requirement: Requirement) -> Self {
        match requirement {
            Requirement::Omit => Self::Scalar(None),
            Requirement::Default => Self::Scalar(Some(String::new())),
            Requirement::Fixed(version) => Self::Scalar(Some(version)),
            Requirement::OneOf(variants) => {
                Self::List(variants.into_iter().map(Option::from).collect())
            }
        }
    }
}
