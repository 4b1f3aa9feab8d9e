//! Total order over JSON values, used by set types to sort and spot duplicates.
use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde_json::{Map, Value};

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// null < boolean < number < string < array < object; within a kind numbers
/// compare numerically, strings lexicographically, containers structurally.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => cmp_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => cmp_seq(xs.iter(), ys.iter()),
        (Value::Object(x), Value::Object(y)) => cmp_maps(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn cmp_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    // integers stay exact; mixed pairs compare by exact value, never through f64
    let float = |n: &serde_json::Number| OrderedFloat(n.as_f64().unwrap_or(f64::NAN));
    match (exact(x), exact(y)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(a), None) => cmp_int_float(a, float(y).0),
        (None, Some(b)) => cmp_int_float(b, float(x).0).reverse(),
        (None, None) => float(x).cmp(&float(y)),
    }
}

fn exact(n: &serde_json::Number) -> Option<i128> {
    n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
}

fn cmp_int_float(i: i128, f: f64) -> Ordering {
    const LIMIT: f64 = 1.7014118346046923e38; // 2^127
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let t = f.trunc();
    i.cmp(&(t as i128)).then_with(|| OrderedFloat(t).cmp(&OrderedFloat(f)))
}

fn cmp_seq<'a>(
    mut xs: impl Iterator<Item = &'a Value>,
    mut ys: impl Iterator<Item = &'a Value>,
) -> Ordering {
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp_values(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

fn cmp_maps(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    let mut xs: Vec<(&String, &Value)> = x.iter().collect();
    let mut ys: Vec<(&String, &Value)> = y.iter().collect();
    xs.sort_by(|a, b| a.0.cmp(b.0));
    ys.sort_by(|a, b| a.0.cmp(b.0));
    for ((kx, vx), (ky, vy)) in xs.iter().zip(ys.iter()) {
        match kx.cmp(ky).then_with(|| cmp_values(vx, vy)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    xs.len().cmp(&ys.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_then_values() {
        let mut xs = vec![json!("b"), json!(2), json!(null), json!("a"), json!(1.5), json!(true)];
        xs.sort_by(cmp_values);
        assert_eq!(xs, vec![json!(null), json!(true), json!(1.5), json!(2), json!("a"), json!("b")]);
    }

    #[test]
    fn objects_compare_regardless_of_key_order() {
        let a = json!({"x": 1, "y": [1, 2]});
        let b = json!({"y": [1, 2], "x": 1});
        assert_eq!(cmp_values(&a, &b), Ordering::Equal);
        assert_eq!(cmp_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }

    #[test]
    fn integer_and_float_forms_are_equal() {
        assert_eq!(cmp_values(&json!(1), &json!(1.0)), Ordering::Equal);
    }

    #[test]
    fn large_integers_order_consistently_with_floats() {
        let big = 1u64 << 53;
        let a = json!(big + 1);
        let b = json!(big as f64);
        let c = json!(big);
        assert_eq!(cmp_values(&a, &b), Ordering::Greater);
        assert_eq!(cmp_values(&b, &c), Ordering::Equal);
        assert_eq!(cmp_values(&a, &c), Ordering::Greater);
        assert_eq!(cmp_values(&json!(2), &json!(1.5)), Ordering::Greater);
        assert_eq!(cmp_values(&json!(-2), &json!(-1.5)), Ordering::Less);
        assert_eq!(cmp_values(&json!(u64::MAX), &json!(1e30)), Ordering::Less);

        let mut xs = vec![a.clone(), b.clone(), json!(1.5), json!(i64::MIN)];
        xs.sort_by(cmp_values);
        assert_eq!(xs, vec![json!(i64::MIN), json!(1.5), b, a]);
    }
}
