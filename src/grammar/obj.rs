use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::ir::{
    Constraints, Discriminated, Extends, Member, ObjectType, PatternProperty, Presence, Property,
    Type,
};

use super::{parse_type, str};

/// Object types. Keys are `name` (required), `name?` (optional),
/// `name?literal` (optional with default), `(regex)` (pattern property),
/// or one of the `@` directives. `{"@if": {prop: T}, "@then": U}` is a
/// discriminated alternative instead.
pub fn parse_object_type(map: &Map<String, Value>) -> Result<Type, SchemaError> {
    if map.contains_key("@if") || map.contains_key("@then") {
        return parse_discriminated(map).map(|d| Type::Switch(Box::new(d)));
    }

    let mut obj = ObjectType::default();
    for (key, value) in map {
        match key.as_str() {
            "@final" => {
                obj.final_ = value.as_bool().ok_or_else(|| bad_key(key, "expects true or false"))?;
            }
            "@extends" => {
                let r = match value.as_str().map(str::parse_type_str).transpose()? {
                    Some(Type::Ref(r)) if !r.is_root() => r,
                    _ => return Err(bad_key(key, "expects a `[URI]#name` reference")),
                };
                obj.extends = Extends::Pending(r);
            }
            "@one" => obj.constraints.one = name_groups(key, value)?,
            "@any" => obj.constraints.any = name_groups(key, value)?,
            "@all" => obj.constraints.all = name_groups(key, value)?,
            "@dep" => obj.constraints = Constraints { dep: dependencies(key, value)?, ..obj.constraints },
            "@note" => obj.note = value.as_str().map(String::from),
            k if k.starts_with('@') => return Err(bad_key(key, "unknown directive")),
            k if k.starts_with('(') => {
                let pattern = str::parse_pattern(k)?;
                obj.members.push(Member::Pattern(PatternProperty { pattern, ty: parse_type(value)? }));
            }
            k => {
                let (name, presence) = split_presence(k);
                if name.is_empty() {
                    return Err(bad_key(key, "property name is empty"));
                }
                if obj.members.iter().any(|m| m.key() == name) {
                    return Err(bad_key(key, "duplicate property"));
                }
                obj.members.push(Member::Prop(Property {
                    name: name.to_string(),
                    presence,
                    ty: parse_type(value)?,
                }));
            }
        }
    }
    Ok(Type::Object(Box::new(obj)))
}

fn split_presence(key: &str) -> (&str, Presence) {
    match key.split_once('?') {
        None => (key, Presence::Required),
        Some((name, "")) => (name, Presence::Optional),
        Some((name, literal)) => (name, Presence::Default(literal.to_string())),
    }
}

fn parse_discriminated(map: &Map<String, Value>) -> Result<Discriminated, SchemaError> {
    if map.len() != 2 {
        return Err(bad_key("@if", "a discriminated type has exactly `@if` and `@then`"));
    }
    let cond = match map.get("@if") {
        Some(Value::Object(cond)) if cond.len() == 1 => cond,
        _ => return Err(bad_key("@if", "expects a single `{property: type}` trigger")),
    };
    let then = map
        .get("@then")
        .ok_or_else(|| bad_key("@then", "missing"))?;
    let (trigger, trigger_ty) = cond
        .iter()
        .next()
        .ok_or_else(|| bad_key("@if", "trigger is empty"))?;
    Ok(Discriminated {
        trigger: trigger.clone(),
        trigger_ty: parse_type(trigger_ty)?,
        then: parse_type(then)?,
    })
}

/// `[["a","b"],["c"]]`
fn name_groups(key: &str, value: &Value) -> Result<Vec<Vec<String>>, SchemaError> {
    let groups = value
        .as_array()
        .ok_or_else(|| bad_key(key, "expects a list of property name lists"))?;
    groups
        .iter()
        .map(|g| names(key, g))
        .collect()
}

/// `{"a": "b"}` or `{"a": ["b","c"]}`
fn dependencies(
    key: &str,
    value: &Value,
) -> Result<indexmap::IndexMap<String, Vec<String>>, SchemaError> {
    let map = value
        .as_object()
        .ok_or_else(|| bad_key(key, "expects a map of property -> dependents"))?;
    let mut out = indexmap::IndexMap::new();
    for (name, deps) in map {
        let deps = match deps {
            Value::String(s) => vec![s.clone()],
            other => names(key, other)?,
        };
        out.insert(name.clone(), deps);
    }
    Ok(out)
}

fn names(key: &str, value: &Value) -> Result<Vec<String>, SchemaError> {
    let xs = value
        .as_array()
        .ok_or_else(|| bad_key(key, "expects a list of property names"))?;
    xs.iter()
        .map(|x| {
            x.as_str()
                .map(String::from)
                .ok_or_else(|| bad_key(key, "property names are strings"))
        })
        .collect()
}

fn bad_key(key: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidKey { key: key.to_string(), reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> ObjectType {
        match parse_type(&v).unwrap() {
            Type::Object(obj) => *obj,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn presence_markers() {
        let obj = object(json!({"a": "string", "b?": "int", "c?1.0": "number", "(x-.*)": "any"}));
        assert_eq!(obj.property("a").unwrap().presence, Presence::Required);
        assert_eq!(obj.property("b").unwrap().presence, Presence::Optional);
        assert_eq!(obj.property("c").unwrap().presence, Presence::Default("1.0".into()));
        assert!(obj.has_patterns());
        let names: Vec<&str> = obj.property_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn directives() {
        let obj = object(json!({
            "@final": true,
            "@extends": "#Base",
            "@note": "doc",
            "@one": [["a", "b"]],
            "@dep": {"a": "b", "c": ["a", "b"]},
            "a?": "int", "b?": "int", "c?": "int"
        }));
        assert!(obj.final_);
        assert_eq!(obj.extends, Extends::Pending(crate::ir::Ref::local("Base")));
        assert_eq!(obj.constraints.one, vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(obj.constraints.dep["c"], vec!["a".to_string(), "b".to_string()]);
        assert_eq!(obj.note.as_deref(), Some("doc"));
    }

    #[test]
    fn discriminated() {
        match parse_type(&json!({"@if": {"kind": "(circle)"}, "@then": "#Circle"})).unwrap() {
            Type::Switch(d) => {
                assert_eq!(d.trigger, "kind");
                assert!(matches!(d.then, Type::Ref(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_type(&json!({"@if": {"a": "int", "b": "int"}, "@then": "#X"})).is_err());
        assert!(parse_type(&json!({"@if": {"a": "int"}})).is_err());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(parse_type(&json!({"@frobnicate": 1})).is_err());
        assert!(parse_type(&json!({"a": "int", "a?": "int"})).is_err());
        assert!(parse_type(&json!({"@extends": "Base"})).is_err());
        assert!(parse_type(&json!({"@one": ["a"]})).is_err());
        assert!(parse_type(&json!({"?": "int"})).is_err());
    }
}
