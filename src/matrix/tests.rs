//! Resolution scenarios for the environment matrix

use super::*;
use crate::errors::ConfigError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::collections::{BTreeMap, BTreeSet};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn raw_rule(pairs: &[(&str, Option<&str>)]) -> RawRule {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.map(str::to_string)))
        .collect()
}

fn env(pairs: &[(&str, &str)]) -> EnvironmentSpec {
    let mut spec = EnvironmentSpec::new("");
    for (key, value) in pairs {
        if *key == PYTHON_KEY {
            spec.python = (*value).to_string();
        } else {
            spec.requirements
                .insert((*key).to_string(), (*value).to_string());
        }
    }
    spec
}

fn ambient() -> AmbientContext {
    AmbientContext::new("something", host_platform())
}

fn exclude_matrix() -> EnvironmentMatrix {
    EnvironmentMatrix {
        pythons: strings(&["2.6", "2.7"]),
        matrix: BTreeMap::from([
            ("a".to_string(), Requirement::Fixed("1".to_string())),
            (
                "b".to_string(),
                Requirement::OneOf(vec![Variant::Fixed("1".to_string()), Variant::Omit]),
            ),
        ]),
        include: vec![raw_rule(&[
            ("python", Some("2.7")),
            ("b", Some("2")),
            ("c", None),
        ])],
        exclude: Vec::new(),
    }
}

#[test]
fn test_expand_basic() {
    let matrix = EnvironmentMatrix {
        pythons: strings(&["2.6", "2.7"]),
        matrix: BTreeMap::from([
            ("pkg1".to_string(), Requirement::Omit),
            ("pkg2".to_string(), Requirement::Default),
            ("pkg3".to_string(), Requirement::OneOf(vec![Variant::Default])),
            ("pkg4".to_string(), Requirement::one_of(["1.2", "3.4"])),
            ("pkg5".to_string(), Requirement::OneOf(Vec::new())),
        ]),
        ..EnvironmentMatrix::default()
    };

    let resolved = matrix.resolve(&ambient()).unwrap();

    let expected = BTreeSet::from([
        env(&[("python", "2.6"), ("pkg2", ""), ("pkg3", ""), ("pkg4", "1.2")]),
        env(&[("python", "2.6"), ("pkg2", ""), ("pkg3", ""), ("pkg4", "3.4")]),
        env(&[("python", "2.7"), ("pkg2", ""), ("pkg3", ""), ("pkg4", "1.2")]),
        env(&[("python", "2.7"), ("pkg2", ""), ("pkg3", ""), ("pkg4", "3.4")]),
    ]);
    assert_eq!(resolved, expected);
}

#[test]
fn test_expand_include() {
    let mut matrix = EnvironmentMatrix {
        pythons: strings(&["2.6"]),
        matrix: BTreeMap::from([("a".to_string(), Requirement::Fixed("1".to_string()))]),
        include: vec![raw_rule(&[("python", Some("3.4")), ("b", Some("2"))])],
        exclude: Vec::new(),
    };

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([
            env(&[("python", "2.6"), ("a", "1")]),
            env(&[("python", "3.4"), ("b", "2")]),
        ])
    );

    matrix.include = vec![raw_rule(&[("b", Some("2"))])];
    let err = matrix.resolve(&ambient()).unwrap_err();
    assert!(matches!(err, ConfigError::IncludeMissingPython { index: 0, .. }));
}

#[test]
fn test_include_with_null_python_is_rejected() {
    let matrix = EnvironmentMatrix {
        pythons: strings(&["2.7"]),
        include: vec![
            raw_rule(&[("python", Some("3.4"))]),
            raw_rule(&[("python", None), ("b", Some("2"))]),
        ],
        ..EnvironmentMatrix::default()
    };

    let err = matrix.resolve(&ambient()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::IncludeMissingPython {
            index: 1,
            rule: r#"{b: "2", python: null}"#.to_string(),
        }
    );
}

#[test]
fn test_invalid_include_fails_even_when_matrix_is_empty() {
    let matrix = EnvironmentMatrix {
        include: vec![raw_rule(&[("b", Some("2"))])],
        ..EnvironmentMatrix::default()
    };
    assert!(matrix.resolve(&ambient()).is_err());
}

#[test]
fn test_expand_exclude_basics() {
    let mut matrix = exclude_matrix();
    matrix.exclude = vec![
        raw_rule(&[("python", Some("2.7")), ("b", Some("2"))]),
        raw_rule(&[("python", Some("2.7")), ("b", None)]),
        raw_rule(&[("python", Some("2.6")), ("a", Some("1"))]),
    ];

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([
            env(&[("python", "2.7"), ("a", "1"), ("b", "1")]),
            env(&[("python", "2.7"), ("b", "2")]),
        ])
    );
}

#[test]
fn test_expand_exclude_regex() {
    let mut matrix = exclude_matrix();
    matrix.exclude = vec![raw_rule(&[("python", Some(".*")), ("b", None)])];

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([
            env(&[("python", "2.6"), ("a", "1"), ("b", "1")]),
            env(&[("python", "2.7"), ("a", "1"), ("b", "1")]),
            env(&[("python", "2.7"), ("b", "2")]),
        ])
    );
}

#[rstest]
#[case::environment_type(raw_rule(&[("environment_type", Some("some.*"))]))]
#[case::sys_platform(raw_rule(&[("sys_platform", Some(host_platform()))]))]
fn test_expand_exclude_ambient_keys(#[case] rule: RawRule) {
    let mut matrix = exclude_matrix();
    matrix.exclude = vec![rule];

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([env(&[("python", "2.7"), ("b", "2")])])
    );
}

#[test]
fn test_expand_exclude_inverted_regex() {
    let mut matrix = exclude_matrix();
    matrix.exclude = vec![raw_rule(&[("python", Some("(?!2.6).*"))])];

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([
            env(&[("python", "2.6"), ("a", "1"), ("b", "1")]),
            env(&[("python", "2.6"), ("a", "1")]),
            env(&[("python", "2.7"), ("b", "2")]),
        ])
    );
}

#[test]
fn test_conditional_include() {
    let matrix = EnvironmentMatrix {
        pythons: strings(&["2.7"]),
        include: vec![
            raw_rule(&[
                ("python", Some("3.4")),
                ("environment_type", Some("conda")),
            ]),
            raw_rule(&[
                ("python", Some("3.5")),
                ("sys_platform", Some(host_platform())),
                ("six", Some("")),
            ]),
        ],
        ..EnvironmentMatrix::default()
    };

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([
            env(&[("python", "2.7")]),
            env(&[("python", "3.5"), ("six", "")]),
        ])
    );

    let conda = matrix
        .resolve(&AmbientContext::new("conda", host_platform()))
        .unwrap();
    assert!(conda.contains(&env(&[("python", "3.4")])));
}

#[test]
fn test_include_duplicate_of_matrix_entry_collapses() {
    let matrix = EnvironmentMatrix {
        pythons: strings(&["2.7"]),
        matrix: BTreeMap::from([("a".to_string(), Requirement::Fixed("1".to_string()))]),
        include: vec![raw_rule(&[("python", Some("2.7")), ("a", Some("1"))])],
        exclude: Vec::new(),
    };

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(resolved.len(), 1);
}

#[test]
fn test_invalid_exclude_pattern() {
    let mut matrix = exclude_matrix();
    matrix.exclude = vec![raw_rule(&[("python", Some("[2"))])];
    assert!(matches!(
        matrix.resolve(&ambient()),
        Err(ConfigError::InvalidPattern { .. })
    ));
}

#[rstest]
#[case(PYTHON_KEY)]
#[case(ENVIRONMENT_TYPE_KEY)]
#[case(SYS_PLATFORM_KEY)]
fn test_reserved_matrix_key_is_rejected(#[case] key: &str) {
    let matrix = EnvironmentMatrix {
        pythons: strings(&["2.7"]),
        matrix: BTreeMap::from([(key.to_string(), Requirement::Fixed("3.4".to_string()))]),
        ..EnvironmentMatrix::default()
    };

    assert_eq!(
        matrix.resolve(&ambient()),
        Err(ConfigError::ReservedMatrixKey {
            key: key.to_string()
        })
    );
    assert!(matrix.validate().is_err());
}

#[test]
fn test_matrix_from_yaml() {
    let yaml = r#"
pythons: ["2.7", "3.4"]
matrix:
  six: ["1.4", null]
  colorama: ["0.3.1", "0.3.3"]
"#;
    let matrix: EnvironmentMatrix = serde_yaml::from_str(yaml).unwrap();
    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(resolved.len(), 2 * 2 * 2);
    assert_eq!(matrix.base_count(), 8);
}

#[test]
fn test_many_empty_dependencies() {
    let matrix = EnvironmentMatrix {
        pythons: strings(&["2.7"]),
        matrix: (0..25)
            .map(|i| (format!("foo{i}"), Requirement::OneOf(Vec::new())))
            .collect(),
        ..EnvironmentMatrix::default()
    };

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(resolved, BTreeSet::from([env(&[("python", "2.7")])]));
}

#[rstest]
#[case(&["2.7"], 1)]
#[case(&["2.6", "2.7"], 2)]
#[case(&["2.6", "2.7", "3.4"], 3)]
fn test_size_is_product_of_variant_counts(#[case] pythons: &[&str], #[case] count: usize) {
    let matrix = EnvironmentMatrix {
        pythons: strings(pythons),
        matrix: BTreeMap::from([
            ("absent".to_string(), Requirement::Omit),
            ("empty".to_string(), Requirement::OneOf(Vec::new())),
            ("three".to_string(), Requirement::one_of(["1", "2", "3"])),
            (
                "two".to_string(),
                Requirement::OneOf(vec![Variant::Default, Variant::Omit]),
            ),
        ]),
        ..EnvironmentMatrix::default()
    };

    let resolved = matrix.resolve(&ambient()).unwrap();
    assert_eq!(resolved.len(), count * 3 * 2);
    assert_eq!(matrix.base_count(), resolved.len());
}

fn shuffled<T: Clone + std::fmt::Debug>(
    values: Vec<T>,
) -> impl Strategy<Value = (Vec<T>, Vec<T>)> {
    let original = values.clone();
    Just(values)
        .prop_shuffle()
        .prop_map(move |shuffled| (original.clone(), shuffled))
}

proptest! {
    #[test]
    fn prop_resolution_is_order_independent(
        (pythons, shuffled_pythons) in prop::collection::vec("[23]\\.[0-9]", 1..4)
            .prop_flat_map(shuffled),
        (variants, shuffled_variants) in prop::collection::vec(prop::option::of("[0-9]?"), 0..4)
            .prop_flat_map(shuffled),
        exclude_python in "[23]\\.[0-9]",
    ) {
        let build = |pythons: Vec<String>, variants: Vec<Option<String>>| EnvironmentMatrix {
            pythons,
            matrix: BTreeMap::from([
                ("pkg".to_string(), Requirement::OneOf(variants.into_iter().map(Variant::from).collect())),
                ("fixed".to_string(), Requirement::Fixed("1.0".to_string())),
            ]),
            include: Vec::new(),
            exclude: vec![raw_rule(&[("python", Some(exclude_python.as_str())), ("pkg", None)])],
        };

        let a = build(pythons, variants).resolve(&ambient()).unwrap();
        let b = build(shuffled_pythons, shuffled_variants).resolve(&ambient()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_include_without_python_always_fails(
        rule in prop::collection::btree_map("[a-z_]{1,8}", prop::option::of("[0-9.]{0,4}"), 0..5)
    ) {
        prop_assume!(!rule.contains_key(PYTHON_KEY));
        let matrix = EnvironmentMatrix {
            pythons: strings(&["2.7"]),
            include: vec![rule],
            ..EnvironmentMatrix::default()
        };
        let is_missing_python = matches!(
            matrix.resolve(&ambient()),
            Err(ConfigError::IncludeMissingPython { .. })
        );
        prop_assert!(is_missing_python);
    }

    #[test]
    fn prop_absent_sentinel_ignores_other_values(
        present in any::<bool>(),
        others in prop::collection::btree_map("[a-c]", "[0-9]{0,2}", 0..3),
    ) {
        let mut candidate = EnvironmentSpec::new("2.7");
        candidate.requirements = others;
        candidate.requirements.remove("key");
        if present {
            candidate.requirements.insert("key".to_string(), String::new());
        }
        let rule = Rule::compile(&raw_rule(&[("key", None)])).unwrap();
        prop_assert_eq!(rule.matches(&candidate, &ambient()), !present);
    }

    #[test]
    fn prop_inverted_regex_removes_only_27(
        deps in prop::collection::btree_map("[a-c]", prop::option::of("[0-9]"), 0..3),
    ) {
        let matrix = EnvironmentMatrix {
            pythons: strings(&["2.6", "2.7"]),
            matrix: deps
                .into_iter()
                .map(|(k, v)| (k, Requirement::OneOf(vec![Variant::from(v)])))
                .collect(),
            include: Vec::new(),
            exclude: vec![raw_rule(&[("python", Some("(?!2.6).*"))])],
        };
        let resolved = matrix.resolve(&ambient()).unwrap();
        prop_assert_eq!(resolved.len(), 1);
        prop_assert!(resolved.iter().all(|spec| spec.python == "2.6"));
    }
}
