use regex::Regex;

use crate::error::SchemaError;
use crate::ir::{Bounds, Pattern, Prim, Ref, Type};

use super::{invalid, num};

/// Parse a type written as a JSON string.
pub fn parse_type_str(src: &str) -> Result<Type, SchemaError> {
    if let Some((base, open, inner)) = split_suffix(src) {
        let bounds = parse_bounds(src, inner)?;
        return match open {
            '[' if base == "char" => Ok(Type::Chars(bounds)),
            '[' => Ok(Type::Array { item: Some(Box::new(parse_type_str(base)?)), bounds }),
            _ => Ok(Type::Set { item: Box::new(parse_type_str(base)?), bounds }),
        };
    }

    if src.starts_with('(') {
        return parse_pattern(src).map(Type::Regex);
    }
    if src.contains('#') {
        return Ok(Type::Ref(parse_ref(src)));
    }
    if let Some(prim) = Prim::from_name(src) {
        return Ok(Type::Prim(prim));
    }
    if num::looks_numeric(src) {
        return num::parse_range(src);
    }
    Err(invalid(src, "unknown type"))
}

/// Split a trailing `[...]` or `{...}` suffix off `src`. Returns the base,
/// the opening bracket, and the text between the brackets.
fn split_suffix(src: &str) -> Option<(&str, char, &str)> {
    let (open, close) = if src.ends_with(']') {
        ('[', ']')
    } else if src.ends_with('}') {
        ('{', '}')
    } else {
        return None;
    };
    let at = src.rfind(open)?;
    let base = &src[..at];
    if base.is_empty() {
        return None;
    }
    let inner = &src[at + 1..src.len() - close.len_utf8()];
    Some((base, open, inner))
}

/// `""`, `"n"`, `"n,"`, `",m"`, `"n,m"`.
fn parse_bounds(src: &str, inner: &str) -> Result<Bounds, SchemaError> {
    let num = |lit: &str| -> Result<Option<usize>, SchemaError> {
        let lit = lit.trim();
        if lit.is_empty() {
            return Ok(None);
        }
        lit.parse::<usize>()
            .map(Some)
            .map_err(|_| invalid(src, format!("`{lit}` is not a length")))
    };
    let bounds = match inner.split_once(',') {
        None => match num(inner)? {
            Some(n) => Bounds::exact(n),
            None => Bounds::ANY,
        },
        Some((a, b)) => Bounds { min: num(a)?, max: num(b)? },
    };
    if let (Some(a), Some(b)) = (bounds.min, bounds.max) {
        if a > b {
            return Err(SchemaError::EmptyBounds(src.to_string()));
        }
    }
    Ok(bounds)
}

/// `(regex)` anchored as `^(regex)$`.
pub fn parse_pattern(src: &str) -> Result<Pattern, SchemaError> {
    if !(src.starts_with('(') && src.ends_with(')')) {
        return Err(invalid(src, "a regex type is written `(pattern)`"));
    }
    let regex = Regex::new(&format!("^{src}$")).map_err(|e| SchemaError::InvalidRegex {
        pattern: src.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Pattern { source: src.to_string(), regex })
}

/// `[URI]#name`; the URI part is everything before the last `#`.
pub fn parse_ref(src: &str) -> Ref {
    match src.rsplit_once('#') {
        Some((uri, name)) => Ref {
            uri: if uri.is_empty() { None } else { Some(uri.to_string()) },
            name: name.to_string(),
        },
        None => Ref::local(src),
    }
}
