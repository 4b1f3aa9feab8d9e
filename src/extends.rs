//! `@extends` expansion.
//!
//! Runs once per group of schemas being added to a set. Bases are expanded
//! before the types deriving from them; each object node's `@extends` is
//! marked `Done` before its base is copied in, so a set never holds a
//! pending expansion.

use std::collections::HashMap;

use crate::error::{ReferenceError, Result, SchemaError};
use crate::ir::{Extends, ObjectType, Ref, Type};
use crate::schema::{Schema, SchemaSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InProgress,
    Done,
}

/// Expand every `@extends` in `group`. Bases may live in the group itself
/// or in `existing`, whose schemas are already expanded.
pub fn expand_group(existing: &SchemaSet, group: &mut [Schema]) -> Result<()> {
    let mut ex = Expander { existing, group, state: HashMap::new() };
    for si in 0..ex.group.len() {
        if let Some(mut root) = ex.group[si].root.take() {
            let r = ex.expand_tree(si, &mut root);
            ex.group[si].root = Some(root);
            r?;
        }
        let names: Vec<String> = ex.group[si].types.keys().cloned().collect();
        for name in names {
            ex.expand_named(si, &name)?;
        }
    }
    Ok(())
}

struct Expander<'a> {
    existing: &'a SchemaSet,
    group: &'a mut [Schema],
    state: HashMap<(usize, String), State>,
}

impl Expander<'_> {
    fn expand_named(&mut self, si: usize, name: &str) -> Result<()> {
        let key = (si, name.to_string());
        match self.state.get(&key) {
            Some(State::Done) => return Ok(()),
            Some(State::InProgress) => return Err(SchemaError::ExtendsCycle(name.to_string()).into()),
            None => {}
        }
        self.state.insert(key.clone(), State::InProgress);

        let Some(slot) = self.group[si].types.get_mut(name) else {
            return Err(self.missing(si, name));
        };
        let mut ty = std::mem::replace(slot, Type::any());
        let r = self.expand_tree(si, &mut ty);
        if let Some(slot) = self.group[si].types.get_mut(name) {
            *slot = ty;
        }
        r?;

        self.state.insert(key, State::Done);
        Ok(())
    }

    fn expand_tree(&mut self, si: usize, ty: &mut Type) -> Result<()> {
        if let Type::Object(obj) = ty {
            if let Extends::Pending(base) = std::mem::replace(&mut obj.extends, Extends::Done) {
                let (copy, qualifier) = self.base(si, &base)?;
                merge(obj, copy, qualifier.as_deref(), &base)?;
            }
        }
        for child in ty.children_mut() {
            self.expand_tree(si, child)?;
        }
        Ok(())
    }

    /// An expanded copy of the base object, plus the `@id` its local
    /// references must be qualified with when it comes from another schema.
    fn base(&mut self, si: usize, r: &Ref) -> Result<(ObjectType, Option<String>)> {
        let own = match r.uri.as_deref() {
            None => Some(si),
            Some(uri) if self.group[si].id() == Some(uri) => Some(si),
            Some(uri) => self.group.iter().position(|s| s.id() == Some(uri)),
        };

        let (ty, qualifier) = match own {
            Some(sj) => {
                self.expand_named(sj, &r.name)?;
                let ty = self.group[sj].get(&r.name).cloned();
                let qualifier = if sj == si { None } else { self.group[sj].id.clone() };
                (ty.ok_or_else(|| self.missing(sj, &r.name))?, qualifier)
            }
            None => {
                let uri = r.uri.clone().unwrap_or_default();
                let schema = self
                    .existing
                    .find(&uri)
                    .ok_or_else(|| ReferenceError::MissingSchema(uri.clone()))?;
                let ty = schema.get(&r.name).cloned().ok_or_else(|| ReferenceError::MissingType {
                    name: r.name.clone(),
                    schema: uri.clone(),
                })?;
                (ty, Some(uri))
            }
        };

        match ty {
            Type::Object(obj) if obj.final_ => Err(SchemaError::ExtendsFinal(r.to_string()).into()),
            Type::Object(obj) => Ok((*obj, qualifier)),
            _ => Err(SchemaError::ExtendsNotObject(r.to_string()).into()),
        }
    }

    fn missing(&self, si: usize, name: &str) -> crate::error::Error {
        ReferenceError::MissingType {
            name: name.to_string(),
            schema: self.group[si].id().unwrap_or("(anonymous)").to_string(),
        }
        .into()
    }
}

/// Copy `base` into `obj`: constraint groups concatenate, `@dep` entries
/// union per key, and members append. A member `obj` already declares is
/// an override and is rejected.
fn merge(obj: &mut ObjectType, base: ObjectType, qualifier: Option<&str>, r: &Ref) -> Result<()> {
    for mut member in base.members {
        if obj.members.iter().any(|m| m.key() == member.key()) {
            return Err(SchemaError::ExtendsOverride {
                base: r.to_string(),
                property: member.key().to_string(),
            }
            .into());
        }
        if let Some(uri) = qualifier {
            member.ty_mut().qualify(uri);
        }
        obj.members.push(member);
    }

    let c = base.constraints;
    obj.constraints.one.extend(c.one);
    obj.constraints.any.extend(c.any);
    obj.constraints.all.extend(c.all);
    for (name, deps) in c.dep {
        let entry = obj.constraints.dep.entry(name).or_default();
        for d in deps {
            if !entry.contains(&d) {
                entry.push(d);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resolve::NoLoader;
    use serde_json::{Value, json};

    fn add(set: &mut SchemaSet, doc: Value) -> Result<usize> {
        set.add(&doc, &NoLoader)
    }

    fn object<'a>(set: &'a SchemaSet, schema: usize, name: &str) -> &'a ObjectType {
        match set.get(schema).and_then(|s| s.get(name)) {
            Some(Type::Object(obj)) => obj,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn base_members_and_constraints_are_copied() {
        let mut set = SchemaSet::default();
        add(&mut set, json!({
            "Base": {"x": "string", "a?": "int", "b?": "int", "@one": [["a", "b"]], "@dep": {"a": "x"}},
            "Derived": {"@extends": "#Base", "y": "number", "@dep": {"a": ["y", "x"]}}
        }))
        .unwrap();
        let d = object(&set, 0, "Derived");
        assert_eq!(d.extends, Extends::Done);
        let names: Vec<&str> = d.property_names().collect();
        assert_eq!(names, ["y", "x", "a", "b"]);
        assert_eq!(d.constraints.one.len(), 1);
        assert_eq!(d.constraints.dep["a"], ["y", "x"]);
    }

    #[test]
    fn chains_expand_bottom_up_in_any_order() {
        let mut set = SchemaSet::default();
        add(&mut set, json!({
            "C": {"@extends": "#B", "c": "int"},
            "B": {"@extends": "#A", "b": "int"},
            "A": {"a": "int"}
        }))
        .unwrap();
        let names: Vec<&str> = object(&set, 0, "C").property_names().collect();
        assert_eq!(names, ["c", "b", "a"]);
    }

    #[test]
    fn illegal_extensions() {
        let mut set = SchemaSet::default();
        let err = add(&mut set, json!({"Base": {"x": "string"}, "D": {"@extends": "#Base", "x": "number"}}));
        assert!(matches!(err, Err(Error::Schema(SchemaError::ExtendsOverride { property, .. })) if property == "x"));

        let err = add(&mut set, json!({"Base": {"x": "string", "@final": true}, "D": {"@extends": "#Base"}}));
        assert!(matches!(err, Err(Error::Schema(SchemaError::ExtendsFinal(_)))));

        let err = add(&mut set, json!({"Base": "string", "D": {"@extends": "#Base"}}));
        assert!(matches!(err, Err(Error::Schema(SchemaError::ExtendsNotObject(_)))));

        let err = add(&mut set, json!({"A": {"@extends": "#B"}, "B": {"@extends": "#A"}}));
        assert!(matches!(err, Err(Error::Schema(SchemaError::ExtendsCycle(_)))));

        let err = add(&mut set, json!({"A": {"@extends": "#Nope"}}));
        assert!(matches!(err, Err(Error::Reference(ReferenceError::MissingType { .. }))));
    }

    #[test]
    fn cross_schema_bases_are_qualified() {
        let mut set = SchemaSet::default();
        add(&mut set, json!({"@id": "urn:base", "Base": {"p": "#Point"}, "Point": [2]})).unwrap();
        add(&mut set, json!({"D": {"@extends": "urn:base#Base"}})).unwrap();
        let d = object(&set, 1, "D");
        match &d.property("p").unwrap().ty {
            Type::Ref(r) => assert_eq!(r.uri.as_deref(), Some("urn:base")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_anonymous_objects_expand() {
        let mut set = SchemaSet::default();
        add(&mut set, json!({"Base": {"x": "int"}, "Outer": {"inner": {"@extends": "#Base", "y": "int"}}})).unwrap();
        let outer = object(&set, 0, "Outer");
        match &outer.property("inner").unwrap().ty {
            Type::Object(inner) => assert!(inner.property("x").is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn copied_unions_do_not_reuse_the_base_table() {
        let mut sjot = crate::Sjot::new();
        sjot.add_schema(&json!({
            "@id": "urn:base",
            "K": "(circle)",
            "Base": {"shape": [[{"@if": {"kind": "#K"}, "@then": {"kind": "string", "r": "int"}}, "null"]]}
        }))
        .unwrap();
        let circle = json!({"shape": {"kind": "circle", "r": 1}});
        assert!(sjot.valid(&circle, Some("urn:base#Base")));

        sjot.add_schema(&json!({"@id": "urn:d", "K": "(square)", "D": {"@extends": "urn:base#Base"}})).unwrap();
        assert!(sjot.valid(&circle, Some("urn:d#D")));
        assert!(!sjot.valid(&json!({"shape": {"kind": "square", "r": 1}}), Some("urn:d#D")));
    }
}
