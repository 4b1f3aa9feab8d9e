//! Type-directed materialization of default literals.
//!
//! The literal after `name?` is plain text; what JSON value it becomes
//! depends on the family of the property's type:
//!
//! | family                          | value                                  |
//! |---------------------------------|----------------------------------------|
//! | `null`                          | `null`                                 |
//! | boolean-like                    | `true` iff the literal is `"true"`     |
//! | integral numerics and ranges    | integer, or float if it has a fraction |
//! | other numerics and ranges       | float                                  |
//! | arrays, sets, tuples, objects   | none                                   |
//! | everything else                 | the literal text, `"null"` as `""`     |
//!
//! A numeric literal that does not parse is kept as text, so it fails
//! validation against its type instead of vanishing.

use serde_json::{Number, Value};

use crate::error::Result;
use crate::ir::{Prim, Type};
use crate::resolve::resolve;
use crate::schema::{Schema, SchemaSet};

// reference hops before giving up; chains are short by construction
const MAX_DEREF: usize = 4;

pub fn materialize(set: &SchemaSet, cur: &Schema, ty: &Type, literal: &str) -> Result<Option<Value>> {
    let mut ty = ty;
    let mut cur = cur;
    for _ in 0..MAX_DEREF {
        match ty {
            Type::Ref(r) => (ty, cur) = resolve(set, cur, r)?,
            _ => break,
        }
    }

    let value = match ty {
        Type::Prim(Prim::Null) => Some(Value::Null),
        Type::Prim(p) if p.is_boolean_like() => Some(Value::Bool(literal == "true")),
        Type::Prim(p) if p.is_numeric_like() => {
            Some(number(literal, matches!(p, Prim::Integer) || p.integral_range().is_some()))
        }
        Type::Range(clauses) => Some(number(literal, clauses.iter().all(|c| c.integral))),
        Type::Prim(Prim::Array | Prim::Object)
        | Type::Array { .. }
        | Type::Set { .. }
        | Type::Tuple(_)
        | Type::Object(_)
        | Type::Union(_)
        | Type::Switch(_)
        | Type::Ref(_) => None,
        _ if literal == "null" => Some(Value::String(String::new())),
        _ => Some(Value::String(literal.to_string())),
    };
    Ok(value)
}

fn number(literal: &str, integral: bool) -> Value {
    if integral {
        if let Ok(i) = literal.parse::<i64>() {
            return Value::Number(i.into());
        }
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(literal.to_string()))
}
