//! Matrix resolution.
//!
//! Expands interpreter versions and the requirement matrix into environment
//! specifications, filters them with exclude rules and appends include rules.

use super::requirement::{Requirement, Variant};
use super::rule::{AmbientContext, RawRule, Rule, is_synthetic_key};
use super::spec::{EnvironmentSpec, PYTHON_KEY};
use super::version::{deserialize_matrix, deserialize_pythons, deserialize_rules};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Declarative description of the environments to benchmark in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvironmentMatrix {
    /// Interpreter versions crossed with the matrix
    #[serde(default, deserialize_with = "deserialize_pythons")]
    pub pythons: Vec<String>,
    /// Dependency name to versions to test
    #[serde(default, deserialize_with = "deserialize_matrix")]
    pub matrix: BTreeMap<String, Requirement>,
    /// Environments added verbatim
    #[serde(default, deserialize_with = "deserialize_rules")]
    pub include: Vec<RawRule>,
    /// Rules removing combinations from the matrix
    #[serde(default, deserialize_with = "deserialize_rules")]
    pub exclude: Vec<RawRule>,
}

impl EnvironmentMatrix {
    /// Resolves this matrix, see [`resolve`]
    pub fn resolve(
        &self,
        ambient: &AmbientContext,
    ) -> Result<BTreeSet<EnvironmentSpec>, ConfigError> {
        resolve(
            &self.pythons,
            &self.matrix,
            &self.include,
            &self.exclude,
            ambient,
        )
    }

    /// Checks the matrix for dependency names that cannot be installed
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_matrix_keys(&self.matrix)
    }

    /// Number of combinations before include/exclude rules are applied
    #[must_use]
    pub fn base_count(&self) -> usize {
        self.pythons.len()
            * self
                .matrix
                .values()
                .map(|r| r.variants().len())
                .product::<usize>()
    }
}

/// An include rule, validated and split into its environment and its
/// ambient conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRule {
    spec: EnvironmentSpec,
    conditions: Rule,
}

impl IncludeRule {
    /// Validates a raw include rule.
    ///
    /// `python` must be present with a non-empty value. Synthetic keys become
    /// conditions on the ambient context; keys with a `null` value are left
    /// out of the environment.
    pub fn compile(index: usize, raw: &RawRule) -> Result<Self, ConfigError> {
        let python = match raw.get(PYTHON_KEY) {
            Some(Some(python)) if !python.is_empty() => python.clone(),
            _ => {
                return Err(ConfigError::IncludeMissingPython {
                    index,
                    rule: render_raw(raw),
                });
            }
        };

        let mut spec = EnvironmentSpec::new(python);
        let mut conditions = RawRule::new();
        for (key, value) in raw {
            if key == PYTHON_KEY {
                continue;
            }
            if is_synthetic_key(key) {
                conditions.insert(key.clone(), value.clone());
            } else if let Some(version) = value {
                spec.requirements.insert(key.clone(), version.clone());
            }
        }

        Ok(Self {
            spec,
            conditions: Rule::compile(&conditions)?,
        })
    }

    /// The environment this rule adds
    #[must_use]
    pub fn spec(&self) -> &EnvironmentSpec {
        &self.spec
    }

    /// True if the rule's platform/backend conditions hold
    #[must_use]
    pub fn applies(&self, ambient: &AmbientContext) -> bool {
        self.conditions.matches(&self.spec, ambient)
    }
}

fn check_matrix_keys(matrix: &BTreeMap<String, Requirement>) -> Result<(), ConfigError> {
    match matrix
        .keys()
        .find(|key| key.as_str() == PYTHON_KEY || is_synthetic_key(key))
    {
        Some(key) => Err(ConfigError::ReservedMatrixKey { key: key.clone() }),
        None => Ok(()),
    }
}

/// Resolves the set of environments to provision.
///
/// 1. Matrix keys and include rules are validated before anything else, so
///    a bad entry fails the whole pass.
/// 2. `pythons` is crossed with the variants of every matrix entry.
/// 3. Combinations matched by any exclude rule are dropped.
/// 4. Include environments are added. They are not subject to exclusion.
///
/// The result is a set; duplicates collapse by value and callers must not
/// depend on its order.
pub fn resolve(
    pythons: &[String],
    matrix: &BTreeMap<String, Requirement>,
    includes: &[RawRule],
    excludes: &[RawRule],
    ambient: &AmbientContext,
) -> Result<BTreeSet<EnvironmentSpec>, ConfigError> {
    check_matrix_keys(matrix)?;
    let includes = includes
        .iter()
        .enumerate()
        .map(|(index, raw)| IncludeRule::compile(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    let excludes = excludes
        .iter()
        .map(Rule::compile)
        .collect::<Result<Vec<_>, _>>()?;

    let axes: Vec<(&str, Vec<Variant>)> = matrix
        .iter()
        .map(|(name, requirement)| (name.as_str(), requirement.variants()))
        .collect();

    let mut resolved = BTreeSet::new();
    let mut excluded = 0usize;
    for python in pythons {
        let mut combinations = Vec::new();
        cartesian_product(&axes, 0, EnvironmentSpec::new(python.clone()), &mut combinations);

        for candidate in combinations {
            if let Some(rule) = excludes.iter().find(|rule| rule.matches(&candidate, ambient)) {
                tracing::trace!(environment = %candidate, rule = %rule, "Excluded");
                excluded += 1;
                continue;
            }
            resolved.insert(candidate);
        }
    }

    for include in &includes {
        if include.applies(ambient) {
            resolved.insert(include.spec.clone());
        } else {
            tracing::trace!(environment = %include.spec, "Include skipped for this platform");
        }
    }

    tracing::debug!(
        pythons = pythons.len(),
        dependencies = matrix.len(),
        includes = includes.len(),
        excluded,
        resolved = resolved.len(),
        "Resolved environment matrix"
    );

    Ok(resolved)
}

/// Recursive helper for the cartesian product over matrix axes
fn cartesian_product(
    axes: &[(&str, Vec<Variant>)],
    index: usize,
    current: EnvironmentSpec,
    results: &mut Vec<EnvironmentSpec>,
) {
    let Some((name, variants)) = axes.get(index) else {
        results.push(current);
        return;
    };

    for variant in variants {
        let mut next = current.clone();
        if let Some(version) = variant.version() {
            next.requirements.insert((*name).to_string(), version.to_string());
        }
        cartesian_product(axes, index + 1, next, results);
    }
}

fn render_raw(raw: &RawRule) -> String {
    let parts: Vec<String> = raw
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{k}: {v:?}"),
            None => format!("{k}: null"),
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}
