//! Fixed patterns of the named string formats.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::Prim;

fn compile(src: &str) -> Regex {
    match Regex::new(src) {
        Ok(rx) => rx,
        Err(error) => panic!("built-in format pattern failed to compile ({src}): {error}"),
    }
}

static BASE64: Lazy<Regex> = Lazy::new(|| compile(r"^[0-9A-Za-z+/]*=?=?$"));
static HEX: Lazy<Regex> = Lazy::new(|| compile(r"^[0-9A-Fa-f]*$"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(urn:uuid:)?[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
});
static DATE: Lazy<Regex> = Lazy::new(|| compile(r"^\d{4}-\d{2}-\d{2}$"));
static TIME: Lazy<Regex> = Lazy::new(|| compile(r"^\d{2}:\d{2}:\d{2}(\.\d{1,6})?([-+]\d{2}:?\d{2}|Z)?$"));
static DATETIME: Lazy<Regex> = Lazy::new(|| {
    compile(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{1,6})?([-+]\d{2}:?\d{2}|Z)?$")
});
static DURATION: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"^-?P(-?[0-9,.]*Y)?(-?[0-9,.]*M)?(-?[0-9,.]*W)?(-?[0-9,.]*D)?(T(-?[0-9,.]*H)?(-?[0-9,.]*M)?(-?[0-9,.]*S)?)?$",
    )
});

/// The pattern of a named format, if `prim` is one.
pub fn pattern(prim: Prim) -> Option<&'static Regex> {
    match prim {
        Prim::Base64 => Some(&*BASE64),
        Prim::Hex => Some(&*HEX),
        Prim::Uuid => Some(&*UUID),
        Prim::Date => Some(&*DATE),
        Prim::Time => Some(&*TIME),
        Prim::DateTime => Some(&*DATETIME),
        Prim::Duration => Some(&*DURATION),
        _ => None,
    }
}
