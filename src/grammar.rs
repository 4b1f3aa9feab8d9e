//! Grammar parser: schema JSON -> `ir::Type`.
//!
//! The type language is embedded in JSON three ways:
//! - strings: primitives, `T[n,m]` / `T{n,m}` suffixes, `(regex)`, numeric
//!   ranges, and `[URI]#name` references;
//! - arrays: array/tuple shapes, and `[[...]]` unions;
//! - objects: object types keyed by property name, plus `@`-directives.
//!
//! Everything here is syntax only. Reference resolution, `@extends`, and
//! union classification happen later, against a prepared `SchemaSet`.
pub mod arr;
pub mod num;
pub mod obj;
pub mod str;

use serde_json::Value;

use crate::error::SchemaError;
use crate::ir::Type;

pub fn parse_type(v: &Value) -> Result<Type, SchemaError> {
    match v {
        Value::String(s) => str::parse_type_str(s),
        Value::Array(xs) => arr::parse_array_type(xs),
        Value::Object(m) => obj::parse_object_type(m),
        other => Err(SchemaError::InvalidType {
            ty: other.to_string(),
            reason: "a type is a string, array, or object".into(),
        }),
    }
}

pub(crate) fn invalid(ty: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidType { ty: ty.to_string(), reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Bounds, Prim};
    use serde_json::json;

    #[test]
    fn json_shapes_dispatch() {
        assert!(matches!(parse_type(&json!("string")).unwrap(), Type::Prim(Prim::String)));
        assert!(matches!(parse_type(&json!([])).unwrap(), Type::Array { item: None, bounds } if bounds == Bounds::ANY));
        assert!(matches!(parse_type(&json!({"a": "int"})).unwrap(), Type::Object(_)));
        assert!(parse_type(&json!(5)).is_err());
        assert!(parse_type(&json!(null)).is_err());
    }
}
