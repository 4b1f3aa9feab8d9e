use serde_json::Value;

use crate::error::SchemaError;
use crate::ir::{Bounds, Type, Union};

use super::{invalid, parse_type};

/// One slot of a structural array: a length literal or a type.
enum Slot<'a> {
    Len(usize),
    Ty(&'a Value),
}

/// Structural array types:
///
/// | shape         | meaning                               |
/// |---------------|---------------------------------------|
/// | `[]`          | any array                             |
/// | `[n]`         | exactly n items, unconstrained        |
/// | `[T]`         | homogeneous, any length               |
/// | `[T,m]`       | homogeneous, at most m                |
/// | `[n,m]`       | n..m items, unconstrained             |
/// | `[n,T]`       | homogeneous, at least n               |
/// | `[n,T,m]`     | homogeneous, n..m                     |
/// | `[[A,B,..]]`  | union                                 |
/// | `[A,B,..]`    | tuple (no length literals)            |
pub fn parse_array_type(xs: &[Value]) -> Result<Type, SchemaError> {
    if let [Value::Array(members)] = xs {
        return parse_union(members);
    }

    let src = Value::Array(xs.to_vec()).to_string();
    let slots = xs
        .iter()
        .map(|x| slot(&src, x))
        .collect::<Result<Vec<_>, _>>()?;

    let homogeneous = |item: &Value, min: Option<usize>, max: Option<usize>| -> Result<Type, SchemaError> {
        let bounds = Bounds { min, max };
        if let (Some(a), Some(b)) = (min, max) {
            if a > b {
                return Err(SchemaError::EmptyBounds(src.clone()));
            }
        }
        Ok(Type::Array { item: Some(Box::new(parse_type(item)?)), bounds })
    };

    match slots.as_slice() {
        [] => Ok(Type::Array { item: None, bounds: Bounds::ANY }),
        [Slot::Len(n)] => Ok(Type::Array { item: None, bounds: Bounds::exact(*n) }),
        [Slot::Ty(t)] => homogeneous(*t, None, None),
        [Slot::Ty(t), Slot::Len(m)] => homogeneous(*t, None, Some(*m)),
        [Slot::Len(n), Slot::Ty(t)] => homogeneous(*t, Some(*n), None),
        [Slot::Len(n), Slot::Ty(t), Slot::Len(m)] => homogeneous(*t, Some(*n), Some(*m)),
        [Slot::Len(n), Slot::Len(m)] => {
            if n > m {
                return Err(SchemaError::EmptyBounds(src.clone()));
            }
            Ok(Type::Array { item: None, bounds: Bounds { min: Some(*n), max: Some(*m) } })
        }
        _ if slots.iter().all(|s| matches!(s, Slot::Ty(_))) => {
            let items = xs.iter().map(parse_type).collect::<Result<Vec<_>, _>>()?;
            Ok(Type::Tuple(items))
        }
        _ => Err(invalid(&src, "length literals only lead or trail a homogeneous array")),
    }
}

fn slot<'a>(src: &str, x: &'a Value) -> Result<Slot<'a>, SchemaError> {
    match x {
        Value::Number(n) => match n.as_u64() {
            Some(n) => Ok(Slot::Len(n as usize)),
            None => Err(invalid(src, format!("`{n}` is not a length"))),
        },
        other => Ok(Slot::Ty(other)),
    }
}

fn parse_union(members: &[Value]) -> Result<Type, SchemaError> {
    let src = Value::Array(vec![Value::Array(members.to_vec())]).to_string();
    if members.is_empty() {
        return Err(invalid(&src, "a union needs at least one member"));
    }
    let mut out = Vec::with_capacity(members.len());
    for m in members {
        let ty = parse_type(m)?;
        if matches!(ty, Type::Union(_)) {
            return Err(SchemaError::NestedUnion(src));
        }
        out.push(ty);
    }
    Ok(Type::Union(Union::new(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Prim;
    use serde_json::json;

    fn parse(v: Value) -> Result<Type, SchemaError> {
        parse_type(&v)
    }

    #[test]
    fn bounded_shapes() {
        assert!(matches!(parse(json!([3])).unwrap(), Type::Array { item: None, bounds } if bounds == Bounds::exact(3)));
        assert!(matches!(parse(json!([1, 4])).unwrap(), Type::Array { item: None, bounds } if bounds == Bounds { min: Some(1), max: Some(4) }));
        assert!(matches!(parse(json!(["int", 2])).unwrap(), Type::Array { item: Some(_), bounds } if bounds == Bounds { min: None, max: Some(2) }));
        assert!(matches!(parse(json!([1, "int"])).unwrap(), Type::Array { item: Some(_), bounds } if bounds == Bounds { min: Some(1), max: None }));
        assert!(matches!(parse(json!([1, "int", 5])).unwrap(), Type::Array { item: Some(_), bounds } if bounds == Bounds { min: Some(1), max: Some(5) }));
        assert!(matches!(parse(json!([5, 1])), Err(SchemaError::EmptyBounds(_))));
    }

    #[test]
    fn tuples_and_unions() {
        match parse(json!(["string", "number"])).unwrap() {
            Type::Tuple(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        match parse(json!([["string", "null"]])).unwrap() {
            Type::Union(u) => assert!(matches!(u.members[1], Type::Prim(Prim::Null))),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse(json!([[[["int"]]]])), Err(SchemaError::NestedUnion(_))));
        assert!(parse(json!([[]])).is_err());
        assert!(parse(json!(["int", 1, "int"])).is_err());
        assert!(parse(json!([-1])).is_err());
    }
}
