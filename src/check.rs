//! Static schema checks, run ahead of any data.
//!
//! Parsing and preparation already reject malformed grammar and illegal
//! `@extends`. This pass walks every prepared type and rejects what only
//! shows up with the whole set in view: dangling references, ambiguous
//! unions, bad or unsatisfiable presence constraints, and defaults that
//! cannot be materialized or do not match their own type.

use crate::config::Options;
use crate::constraints;
use crate::defaults;
use crate::error::{Error, Result, SchemaError};
use crate::ir::{Member, ObjectType, Presence, Type};
use crate::matcher::Matcher;
use crate::resolve::{SchemaLoader, resolve};
use crate::schema::{Schema, SchemaSet};
use crate::union;

pub(crate) fn check_set(set: &SchemaSet, loader: &dyn SchemaLoader, options: &Options) -> Result<()> {
    let m = Matcher::new(set, loader, options);
    for schema in set.iter() {
        check_schema(&m, schema, options)?;
    }
    Ok(())
}

fn check_schema(m: &Matcher<'_>, schema: &Schema, options: &Options) -> Result<()> {
    for (name, ty) in schema.all_types() {
        tracing::trace!(schema = schema.id().unwrap_or("(anonymous)"), name, "checking type");
        ty.try_walk(&mut |t| check_node(m, schema, t, options))?;
    }
    Ok(())
}

fn check_node(m: &Matcher<'_>, cur: &Schema, ty: &Type, options: &Options) -> Result<()> {
    match ty {
        Type::Ref(r) => {
            resolve(m.set, cur, r)?;
        }
        Type::Union(u) => {
            union::table(m.set, cur, u)?;
        }
        Type::Object(obj) => check_object(m, cur, obj, options)?,
        _ => {}
    }
    Ok(())
}

fn check_object(m: &Matcher<'_>, cur: &Schema, obj: &ObjectType, options: &Options) -> Result<()> {
    constraints::check_references(obj)?;
    if !constraints::satisfiable(&obj.constraints, options.sat_max_vars) {
        return Err(SchemaError::Unsatisfiable(Type::Object(Box::new(obj.clone())).to_string()).into());
    }

    for member in &obj.members {
        let Member::Prop(p) = member else { continue };
        let Presence::Default(literal) = &p.presence else { continue };
        let Some(mut value) = defaults::materialize(m.set, cur, &p.ty, literal)? else {
            return Err(SchemaError::NoDefault {
                property: p.name.clone(),
                literal: literal.clone(),
                ty: p.ty.to_string(),
            }
            .into());
        };
        if let Err(e) = m.run(&mut value, &p.ty, cur) {
            let reason = match e {
                Error::Validation(v) => v.message,
                other => return Err(other),
            };
            return Err(SchemaError::BadDefault { property: p.name.clone(), literal: literal.clone(), reason }.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReferenceError;
    use crate::resolve::NoLoader;
    use serde_json::{Value, json};

    fn check(doc: Value) -> Result<()> {
        let mut set = SchemaSet::default();
        set.add(&doc, &NoLoader)?;
        check_set(&set, &NoLoader, &Options::default())
    }

    #[test]
    fn well_formed_schema_passes() {
        check(json!({
            "@root": "#Doc",
            "Doc": {"title": "string", "tags?": "string{}", "n?0": "int", "kind": [["null", "#Kind"]]},
            "Kind": "(a|b)"
        }))
        .unwrap();
    }

    #[test]
    fn union_conflicts_surface() {
        let err = check(json!({"U": [["string", "(abc)"]]})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::UnionConflict { .. })));
    }

    #[test]
    fn dangling_references_surface() {
        let err = check(json!({"A": {"b": "#B"}})).unwrap_err();
        assert!(matches!(err, Error::Reference(ReferenceError::MissingType { .. })));
    }

    #[test]
    fn constraint_problems_surface() {
        let err = check(json!({"O": {"a?": "int", "b?": "int", "@one": [["a", "b"]], "@all": [["a", "b"]]}})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::Unsatisfiable(_))));

        let err = check(json!({"O": {"a": "int", "@any": [["a"]]}})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::BadConstraint { .. })));
    }

    #[test]
    fn default_problems_surface() {
        let err = check(json!({"O": {"xs?1": "int[]"}})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::NoDefault { .. })));

        let err = check(json!({"O": {"n?7": "0..5"}})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::BadDefault { .. })));

        let err = check(json!({"O": {"n?abc": "number"}})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::BadDefault { .. })));
    }
}
