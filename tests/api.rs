use serde_json::{Value, json};
use sjot::{Error, Options, ReferenceError, SchemaError, Sjot};

fn sjot(schema: Value) -> Sjot {
    let mut s = Sjot::new();
    s.add_schema(&schema).unwrap();
    s
}

#[test]
fn ambiguous_union_is_a_schema_error() {
    let err = sjot::check(&json!({"U": [["string", "(abc)"]]})).unwrap_err();
    assert!(matches!(err, Error::Schema(SchemaError::UnionConflict { .. })), "{err}");
}

#[test]
fn final_object_rejects_undeclared_keys() {
    let s = sjot(json!({"P": {"a": "string", "@final": true}}));
    assert!(s.valid(&json!({"a": "x"}), None));
    let err = s.validate(&json!({"a": "x", "b": 1}), None).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains('b'), "{err}");
}

#[test]
fn extends_may_not_override() {
    let err = sjot::check(&json!({"B": {"a": "int"}, "D": {"@extends": "#B", "a": "string"}, "@root": "#D"})).unwrap_err();
    assert!(matches!(err, Error::Schema(SchemaError::ExtendsOverride { .. })), "{err}");
}

#[test]
fn contradictory_constraints_are_rejected() {
    let err = sjot::check(&json!({"O": {"a?": "int", "b?": "int", "@one": [["a", "b"]], "@all": [["a", "b"]]}})).unwrap_err();
    assert!(matches!(err, Error::Schema(SchemaError::Unsatisfiable(_))), "{err}");
}

#[test]
fn defaults_are_idempotent() {
    let s = sjot(json!({"O": {"v?1.0": "number"}}));
    let once = s.validate(&json!({}), None).unwrap();
    assert_eq!(once, json!({"v": 1.0}));
    assert_eq!(s.validate(&once, None).unwrap(), once);
}

#[test]
fn sets_are_sorted_and_deduplicated() {
    assert_eq!(sjot::validate(&json!(["c", "a", "b"]), Some("string{1,}"), None).unwrap(), json!(["a", "b", "c"]));
    assert!(!sjot::valid(&json!(["a", "a"]), Some("string{1,}"), None));
    assert!(!sjot::valid(&json!([]), Some("string{1,}"), None));
}

#[test]
fn ranges() {
    assert!(sjot::valid(&json!(5), Some("<0..10>"), None));
    assert!(!sjot::valid(&json!(0), Some("<0..10>"), None));
    assert!(!sjot::valid(&json!(10), Some("<0..10>"), None));
    assert!(sjot::valid(&json!(2), Some("1,2,3"), None));
    assert!(!sjot::valid(&json!(4), Some("1,2,3"), None));
    assert!(!sjot::valid(&json!(2.5), Some("1,2,3"), None));
}

#[test]
fn tuple_arity_is_exact() {
    let t = json!({"T": ["int", "string"]});
    assert!(sjot::valid(&json!([1, "a"]), None, Some(&t)));
    assert!(!sjot::valid(&json!([1]), None, Some(&t)));
    assert!(!sjot::valid(&json!([1, "a", 2]), None, Some(&t)));
}

#[test]
fn valid_reports_every_failure_as_false() {
    let broken = json!({"A": "nonsense-type"});
    assert!(!sjot::valid(&json!(1), None, Some(&broken)));
    assert!(!sjot::valid(&json!(1), Some("#Missing"), Some(&json!({"A": "int"}))));
    assert!(!sjot::valid(&json!(1), Some("http://nowhere/s.json#A"), None));
    assert!(sjot::valid(&json!({"anything": [1, null]}), None, None));
}

#[test]
fn loader_resolves_external_types() {
    let s = Sjot::new().with_loader(|uri: &str| -> Result<Value, String> {
        match uri {
            "http://example.org/geo.json" => Ok(json!({"Point": ["number", "number"]})),
            other => Err(format!("unknown {other}")),
        }
    });
    assert!(s.valid(&json!([1, 2]), Some("http://example.org/geo.json#Point")));
    assert!(!s.valid(&json!([1]), Some("http://example.org/geo.json#Point")));

    let err = s.validate(&json!(1), Some("http://example.org/other.json#X")).unwrap_err();
    assert!(matches!(err, Error::Reference(ReferenceError::Load { .. })), "{err}");
}

#[test]
fn validate_copies_and_validate_in_place_rewrites() {
    let s = sjot(json!({"O": {"n?3": "int", "tags?": "string{}"}}));
    let data = json!({"tags": ["b", "a"]});
    let out = s.validate(&data, None).unwrap();
    assert_eq!(data, json!({"tags": ["b", "a"]}));
    assert_eq!(out, json!({"tags": ["a", "b"], "n": 3}));

    let mut data = data;
    s.validate_in_place(&mut data, None).unwrap();
    assert_eq!(data, out);
}

#[test]
fn diagnostics_can_be_switched_off() {
    let schema = json!({"O": {"xs": "int[]"}});
    let data = json!({"xs": [1, "two"]});

    let err = sjot(schema.clone()).validate(&data, None).unwrap_err();
    let Error::Validation(v) = err else { panic!("expected a validation error") };
    assert_eq!(v.data_path, "/xs/1");

    let quiet = Options { diagnostics: false, ..Options::default() };
    let mut s = Sjot::new().with_options(quiet);
    s.add_schema(&schema).unwrap();
    let Error::Validation(v) = s.validate(&data, None).unwrap_err() else { panic!("expected a validation error") };
    assert!(v.data_path.is_empty() && v.type_path.is_empty());
}

#[test]
fn embedded_schema_is_enforced() {
    let data = json!({"@sjot": {"@root": {"n": "int"}}, "n": "x"});
    assert!(!sjot::valid(&data, None, None));
    let data = json!({"@sjot": {"@root": {"n": "int"}}, "n": 1});
    assert!(sjot::valid(&data, None, None));
}

#[test]
fn fetched_schemas_are_kept_between_validations() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let s = Sjot::new().with_loader(move |uri: &str| -> Result<Value, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        match uri {
            "urn:geo" => Ok(json!({"P": ["number", "number"]})),
            other => Err(format!("unknown {other}")),
        }
    });
    for _ in 0..3 {
        assert!(s.valid(&json!([1, 2]), Some("urn:geo#P")));
    }
    assert!(!s.valid(&json!(1), Some("urn:geo#P")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let embedded = json!({"@sjot": "urn:geo#P", "x": 1});
    assert!(!s.valid(&embedded, None));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(s.schemas().is_empty(), "fetched schemas do not become the default schema");
}

#[test]
fn recursive_unions_pass_check() {
    let tree = json!({"Tree": [["int", "#Tree[]"]]});
    sjot::check(&tree).unwrap();
    assert!(sjot::valid(&json!([1, [2]]), None, Some(&tree)));
    assert!(!sjot::valid(&json!([["x"]]), None, Some(&tree)));
}
