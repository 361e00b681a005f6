//! Deserialization of version strings.
//!
//! Versions must be written as strings. YAML reads an unquoted `3.10` as the
//! float `3.1`, so numbers are rejected with an error naming the key they
//! belong to instead of being converted.

use super::requirement::{Requirement, Variant};
use super::rule::RawRule;
use super::spec::PYTHON_KEY;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use std::collections::BTreeMap;
use std::fmt;

fn unquoted<E: de::Error>(key: Option<&str>, value: impl fmt::Display) -> E {
    match key {
        Some(key) => E::custom(format!(
            "'{key}': version {value} must be a quoted string, e.g. \"{value}\""
        )),
        None => E::custom(format!(
            "version {value} must be a quoted string, e.g. \"{value}\""
        )),
    }
}

/// A version string or null
struct VersionVisitor<'a> {
    key: Option<&'a str>,
}

impl<'de> Visitor<'de> for VersionVisitor<'_> {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a version string or null")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Err(unquoted(self.key, v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Err(unquoted(self.key, v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Err(unquoted(self.key, v))
    }
}

struct VersionSeed<'a> {
    key: Option<&'a str>,
}

impl<'de> DeserializeSeed<'de> for VersionSeed<'_> {
    type Value = Option<String>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(VersionVisitor { key: self.key })
    }
}

/// A matrix entry: a scalar version, null, or a list of them
pub(super) struct RequirementVisitor<'a> {
    pub(super) key: Option<&'a str>,
}

impl<'de> Visitor<'de> for RequirementVisitor<'_> {
    type Value = Requirement;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a version string, null, or a list of them")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Requirement::Omit)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Requirement::Omit)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Variant::from(Some(v.to_string())).into())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Variant::from(Some(v)).into())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Err(unquoted(self.key, v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Err(unquoted(self.key, v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Err(unquoted(self.key, v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut variants = Vec::new();
        while let Some(version) = seq.next_element_seed(VersionSeed { key: self.key })? {
            variants.push(Variant::from(version));
        }
        Ok(Requirement::OneOf(variants))
    }
}

struct RequirementSeed<'a> {
    key: &'a str,
}

impl<'de> DeserializeSeed<'de> for RequirementSeed<'_> {
    type Value = Requirement;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(RequirementVisitor { key: Some(self.key) })
    }
}

/// Deserializes the requirement matrix, naming the dependency in errors
pub(super) fn deserialize_matrix<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Requirement>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MatrixVisitor;

    impl<'de> Visitor<'de> for MatrixVisitor {
        type Value = BTreeMap<String, Requirement>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of dependency names to versions")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut matrix = BTreeMap::new();
            while let Some(key) = map.next_key::<String>()? {
                let requirement = map.next_value_seed(RequirementSeed { key: &key })?;
                matrix.insert(key, requirement);
            }
            Ok(matrix)
        }
    }

    deserializer.deserialize_map(MatrixVisitor)
}

/// Deserializes the interpreter list
pub(super) fn deserialize_pythons<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PythonsVisitor;

    impl<'de> Visitor<'de> for PythonsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of python version strings")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut pythons = Vec::new();
            while let Some(version) = seq.next_element_seed(VersionSeed {
                key: Some(PYTHON_KEY),
            })? {
                let version = version.ok_or_else(|| {
                    <A::Error as de::Error>::custom("python versions must not be null")
                })?;
                pythons.push(version);
            }
            Ok(pythons)
        }
    }

    deserializer.deserialize_seq(PythonsVisitor)
}

/// One include or exclude rule
struct RuleSeed;

impl<'de> DeserializeSeed<'de> for RuleSeed {
    type Value = RawRule;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<RawRule, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for RuleSeed {
    type Value = RawRule;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of keys to version patterns")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawRule, A::Error> {
        let mut rule = RawRule::new();
        while let Some(key) = map.next_key::<String>()? {
            let pattern = map.next_value_seed(VersionSeed { key: Some(&key) })?;
            rule.insert(key, pattern);
        }
        Ok(rule)
    }
}

/// Deserializes include or exclude rules, naming the key in errors
pub(super) fn deserialize_rules<'de, D>(deserializer: D) -> Result<Vec<RawRule>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RulesVisitor;

    impl<'de> Visitor<'de> for RulesVisitor {
        type Value = Vec<RawRule>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of rules")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut rules = Vec::new();
            while let Some(rule) = seq.next_element_seed(RuleSeed)? {
                rules.push(rule);
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_seq(RulesVisitor)
}

#[cfg(test)]
mod tests {
    use super::super::EnvironmentMatrix;
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse_error(yaml: &str) -> String {
        serde_yaml::from_str::<EnvironmentMatrix>(yaml)
            .unwrap_err()
            .to_string()
    }

    #[rstest]
    #[case("pythons: [2.7]\n", "'python': version 2.7 must be a quoted string")]
    #[case("pythons: ['2.7', 3]\n", "'python': version 3 must be a quoted string")]
    #[case("matrix:\n  six: 1.4\n", "'six': version 1.4 must be a quoted string")]
    #[case("matrix:\n  six: [1.4, null]\n", "'six': version 1.4 must be a quoted string")]
    #[case("exclude:\n  - python: 2.7\n", "'python': version 2.7 must be a quoted string")]
    fn test_unquoted_numbers_are_rejected(#[case] yaml: &str, #[case] message: &str) {
        let err = parse_error(yaml);
        assert!(err.contains(message), "{err}");
    }

    #[test]
    fn test_null_python_is_rejected() {
        assert!(parse_error("pythons: ['2.7', null]\n").contains("must not be null"));
    }

    #[test]
    fn test_quoted_versions_keep_trailing_zeros() {
        let matrix: EnvironmentMatrix = serde_yaml::from_str(
            "pythons: ['3.10']\nmatrix:\n  six: ['1.10', null, '']\ninclude:\n  - python: '3.10'\n    six: null\n",
        )
        .unwrap();

        assert_eq!(matrix.pythons, vec!["3.10"]);
        assert_eq!(
            matrix.matrix["six"],
            Requirement::OneOf(vec![
                Variant::Fixed("1.10".to_string()),
                Variant::Omit,
                Variant::Default,
            ])
        );
        assert_eq!(
            matrix.include,
            vec![RawRule::from([
                ("python".to_string(), Some("3.10".to_string())),
                ("six".to_string(), None),
            ])]
        );
    }

    #[test]
    fn test_standalone_requirement_without_key() {
        let err = serde_json::from_str::<Requirement>("1.5").unwrap_err().to_string();
        assert!(err.contains("version 1.5 must be a quoted string"), "{err}");
        assert_eq!(
            serde_json::from_str::<Requirement>(r#""1.5""#).unwrap(),
            Requirement::Fixed("1.5".to_string())
        );
    }
}
