use crate::error::SchemaError;
use crate::ir::{RangeClause, Type};

use super::invalid;

/// True if `s` can only be a numeric range list.
pub fn looks_numeric(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | '<'))
}

/// `"1..5"`, `"<0..10>"`, `"..9"`, `"1.0.."`, `"1,2,3"`: comma-separated
/// clauses, each an optional `<` (exclusive lower), optional `>` suffix
/// (exclusive upper), and either one value or a `lo..hi` pair.
pub fn parse_range(src: &str) -> Result<Type, SchemaError> {
    let clauses = src
        .split(',')
        .map(|c| parse_clause(src, c.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Type::Range(clauses))
}

fn parse_clause(src: &str, clause: &str) -> Result<RangeClause, SchemaError> {
    let (lo_exclusive, rest) = match clause.strip_prefix('<') {
        Some(rest) => (true, rest),
        None => (false, clause),
    };
    let (hi_exclusive, rest) = match rest.strip_suffix('>') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    if rest.is_empty() {
        return Err(invalid(src, "empty range clause"));
    }

    let (lo_lit, hi_lit) = match rest.split_once("..") {
        Some((a, b)) => (a, b),
        None => (rest, rest),
    };
    if lo_lit.is_empty() && hi_lit.is_empty() {
        return Err(invalid(src, "range clause needs at least one bound"));
    }

    let lo = parse_bound(src, lo_lit)?;
    let hi = parse_bound(src, hi_lit)?;
    let integral = !lo_lit.contains('.') && !hi_lit.contains('.');

    if let (Some(a), Some(b)) = (lo, hi) {
        let exclusive = lo_exclusive || hi_exclusive;
        if a > b || (a == b && exclusive) {
            return Err(SchemaError::EmptyRange(src.to_string()));
        }
    }

    Ok(RangeClause { lo, hi, lo_exclusive, hi_exclusive, integral })
}

fn parse_bound(src: &str, lit: &str) -> Result<Option<f64>, SchemaError> {
    if lit.is_empty() {
        return Ok(None);
    }
    match lit.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(Some(x)),
        _ => Err(invalid(src, format!("`{lit}` is not a number"))),
    }
}
