// Strongly-typed IR for the schema grammar. Grammar strings are parsed once
// (see `grammar`); the matcher never re-scans them.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::union::UnionTable;

#[derive(Debug, Clone)]
pub enum Type {
    Prim(Prim),
    Range(Vec<RangeClause>),       // "1..5", "<0..10>", "1,2,3"
    Regex(Pattern),                // "(abc)" -> ^(abc)$
    Chars(Bounds),                 // "char[]" / "char[n,m]": a string with length bounds
    Array {
        item: Option<Box<Type>>,   // None: items unconstrained
        bounds: Bounds,
    },
    Tuple(Vec<Type>),              // exact arity, one type per slot
    Set {
        item: Box<Type>,
        bounds: Bounds,
    },
    Union(Union),
    Ref(Ref),
    Object(Box<ObjectType>),
    Switch(Box<Discriminated>),    // {"@if": {prop: T}, "@then": U}
}

/// The fixed vocabulary of named types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Any,
    Atom,
    Null,
    Boolean,
    True,
    False,
    Number,
    Float,
    Double,
    Integer,
    Byte,
    Short,
    Int,
    Long,
    UByte,
    UShort,
    UInt,
    ULong,
    String,
    Char,
    Base64,
    Hex,
    Uuid,
    Date,
    Time,
    DateTime,
    Duration,
    Object,
    Array,
}

const PRIM_NAMES: &[(&str, Prim)] = &[
    ("any", Prim::Any),
    ("atom", Prim::Atom),
    ("null", Prim::Null),
    ("boolean", Prim::Boolean),
    ("true", Prim::True),
    ("false", Prim::False),
    ("number", Prim::Number),
    ("float", Prim::Float),
    ("double", Prim::Double),
    ("integer", Prim::Integer),
    ("byte", Prim::Byte),
    ("short", Prim::Short),
    ("int", Prim::Int),
    ("long", Prim::Long),
    ("ubyte", Prim::UByte),
    ("ushort", Prim::UShort),
    ("uint", Prim::UInt),
    ("ulong", Prim::ULong),
    ("string", Prim::String),
    ("char", Prim::Char),
    ("base64", Prim::Base64),
    ("hex", Prim::Hex),
    ("uuid", Prim::Uuid),
    ("date", Prim::Date),
    ("time", Prim::Time),
    ("datetime", Prim::DateTime),
    ("duration", Prim::Duration),
    ("object", Prim::Object),
    ("array", Prim::Array),
];

impl Prim {
    pub fn from_name(name: &str) -> Option<Prim> {
        PRIM_NAMES.iter().find(|(n, _)| *n == name).map(|(_, p)| *p)
    }

    pub fn name(self) -> &'static str {
        PRIM_NAMES
            .iter()
            .find(|(_, p)| *p == self)
            .map(|(n, _)| *n)
            .unwrap_or("any")
    }

    pub fn is_boolean_like(self) -> bool {
        matches!(self, Prim::Boolean | Prim::True | Prim::False)
    }

    pub fn is_numeric_like(self) -> bool {
        matches!(
            self,
            Prim::Number
                | Prim::Float
                | Prim::Double
                | Prim::Integer
                | Prim::Byte
                | Prim::Short
                | Prim::Int
                | Prim::Long
                | Prim::UByte
                | Prim::UShort
                | Prim::UInt
                | Prim::ULong
        )
    }

    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            Prim::String
                | Prim::Char
                | Prim::Base64
                | Prim::Hex
                | Prim::Uuid
                | Prim::Date
                | Prim::Time
                | Prim::DateTime
                | Prim::Duration
        )
    }

    /// Inclusive integral range of the fixed-width aliases.
    pub fn integral_range(self) -> Option<(i128, i128)> {
        match self {
            Prim::Byte => Some((i8::MIN as i128, i8::MAX as i128)),
            Prim::Short => Some((i16::MIN as i128, i16::MAX as i128)),
            Prim::Int => Some((i32::MIN as i128, i32::MAX as i128)),
            Prim::Long => Some((i64::MIN as i128, i64::MAX as i128)),
            Prim::UByte => Some((0, u8::MAX as i128)),
            Prim::UShort => Some((0, u16::MAX as i128)),
            Prim::UInt => Some((0, u32::MAX as i128)),
            Prim::ULong => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }
}

/// One clause of a numeric range list.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeClause {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
    pub lo_exclusive: bool,
    pub hi_exclusive: bool,
    pub integral: bool,            // no bound literal carried a decimal point
}

impl RangeClause {
    pub fn contains(&self, x: f64) -> bool {
        if self.integral && x.fract() != 0.0 {
            return false;
        }
        let above = match self.lo {
            Some(lo) if self.lo_exclusive => x > lo,
            Some(lo) => x >= lo,
            None => true,
        };
        let below = match self.hi {
            Some(hi) if self.hi_exclusive => x < hi,
            Some(hi) => x <= hi,
            None => true,
        };
        above && below
    }
}

/// Length bounds of arrays, sets and bounded strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Bounds {
    pub const ANY: Bounds = Bounds { min: None, max: None };

    pub fn exact(n: usize) -> Self {
        Bounds { min: Some(n), max: Some(n) }
    }

    pub fn contains(&self, len: usize) -> bool {
        self.min.is_none_or(|m| len >= m) && self.max.is_none_or(|m| len <= m)
    }

    pub fn is_any(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// A compiled string pattern. `source` keeps the parenthesised text as
/// written; the regex is anchored around it.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub regex: Regex,
}

impl Pattern {
    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

/// Alternatives plus the lazily built disambiguation table.
#[derive(Debug)]
pub struct Union {
    pub members: Vec<Type>,
    pub(crate) table: OnceCell<UnionTable>,
}

// A table is only valid in the scope it was built in; copies rebuild theirs.
impl Clone for Union {
    fn clone(&self) -> Self {
        Union::new(self.members.clone())
    }
}

impl Union {
    pub fn new(members: Vec<Type>) -> Self {
        Union { members, table: OnceCell::new() }
    }
}

/// Unresolved link `[uri]#name`. An empty name denotes the root type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    pub uri: Option<String>,
    pub name: String,
}

impl Ref {
    pub fn local(name: impl Into<String>) -> Self {
        Ref { uri: None, name: name.into() }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    pub members: Vec<Member>,      // declaration order is semantic
    pub constraints: Constraints,
    pub final_: bool,
    pub extends: Extends,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Member {
    Prop(Property),
    Pattern(PatternProperty),
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub presence: Presence,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Default(String),               // literal text after `?`
}

#[derive(Debug, Clone)]
pub struct PatternProperty {
    pub pattern: Pattern,
    pub ty: Type,
}

/// `@one` / `@any` / `@all` name groups and `@dep` edges.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub one: Vec<Vec<String>>,
    pub any: Vec<Vec<String>>,
    pub all: Vec<Vec<String>>,
    pub dep: IndexMap<String, Vec<String>>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.one.is_empty() && self.any.is_empty() && self.all.is_empty() && self.dep.is_empty()
    }

    /// Every property name mentioned, first occurrence order.
    pub fn names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let groups = self.one.iter().chain(&self.any).chain(&self.all);
        let deps = self
            .dep
            .iter()
            .flat_map(|(k, vs)| std::iter::once(k).chain(vs.iter()));
        for name in groups.flatten().chain(deps) {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }
}

/// `@extends` state. Expansion happens once, during schema preparation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Extends {
    #[default]
    None,
    Pending(Ref),
    Done,
}

/// A union alternative selected by the value of one trigger property.
#[derive(Debug, Clone)]
pub struct Discriminated {
    pub trigger: String,
    pub trigger_ty: Type,
    pub then: Type,
}

impl ObjectType {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.members.iter().find_map(|m| match m {
            Member::Prop(p) if p.name == name => Some(p),
            _ => None,
        })
    }

    /// Names of the plain (non-pattern) properties.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().filter_map(|m| match m {
            Member::Prop(p) => Some(p.name.as_str()),
            Member::Pattern(_) => None,
        })
    }

    pub fn has_patterns(&self) -> bool {
        self.members.iter().any(|m| matches!(m, Member::Pattern(_)))
    }
}

impl Member {
    pub fn ty(&self) -> &Type {
        match self {
            Member::Prop(p) => &p.ty,
            Member::Pattern(p) => &p.ty,
        }
    }

    pub fn ty_mut(&mut self) -> &mut Type {
        match self {
            Member::Prop(p) => &mut p.ty,
            Member::Pattern(p) => &mut p.ty,
        }
    }

    /// The key this member was declared under.
    pub fn key(&self) -> &str {
        match self {
            Member::Prop(p) => &p.name,
            Member::Pattern(p) => &p.pattern.source,
        }
    }
}

// -------------------------------- Traversal -------------------------------- //

impl Type {
    pub fn any() -> Self {
        Type::Prim(Prim::Any)
    }

    /// Direct child types, in declaration order.
    pub fn children(&self) -> Vec<&Type> {
        match self {
            Type::Array { item: Some(item), .. } => vec![&**item],
            Type::Set { item, .. } => vec![&**item],
            Type::Tuple(items) => items.iter().collect(),
            Type::Union(u) => u.members.iter().collect(),
            Type::Object(obj) => obj.members.iter().map(Member::ty).collect(),
            Type::Switch(d) => vec![&d.trigger_ty, &d.then],
            _ => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Type> {
        match self {
            Type::Array { item: Some(item), .. } => vec![&mut **item],
            Type::Set { item, .. } => vec![&mut **item],
            Type::Tuple(items) => items.iter_mut().collect(),
            Type::Union(u) => u.members.iter_mut().collect(),
            Type::Object(obj) => obj.members.iter_mut().map(Member::ty_mut).collect(),
            Type::Switch(d) => vec![&mut d.trigger_ty, &mut d.then],
            _ => Vec::new(),
        }
    }

    /// Pre-order walk that stops at the first error.
    pub fn try_walk<E>(&self, f: &mut impl FnMut(&Type) -> Result<(), E>) -> Result<(), E> {
        f(self)?;
        for child in self.children() {
            child.try_walk(f)?;
        }
        Ok(())
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Type)) {
        f(self);
        for child in self.children_mut() {
            child.walk_mut(f);
        }
    }

    /// Rewrite local references so they keep pointing into schema `uri`
    /// after the type is copied elsewhere.
    pub fn qualify(&mut self, uri: &str) {
        self.walk_mut(&mut |ty| match ty {
            Type::Ref(r) if r.uri.is_none() => r.uri = Some(uri.to_string()),
            Type::Object(obj) => {
                if let Extends::Pending(r) = &mut obj.extends {
                    if r.uri.is_none() {
                        r.uri = Some(uri.to_string());
                    }
                }
            }
            Type::Union(u) => u.table = OnceCell::new(),
            _ => {}
        });
    }

    /// External schema URIs mentioned anywhere below this type.
    pub fn external_uris(&self) -> Vec<String> {
        let mut out = Vec::new();
        let _ = self.try_walk(&mut |ty| -> Result<(), ()> {
            let uri = match ty {
                Type::Ref(r) => r.uri.as_ref(),
                Type::Object(obj) => match &obj.extends {
                    Extends::Pending(r) => r.uri.as_ref(),
                    _ => None,
                },
                _ => None,
            };
            if let Some(uri) = uri {
                if !out.contains(uri) {
                    out.push(uri.clone());
                }
            }
            Ok(())
        });
        out
    }
}

// --------------------------------- Display --------------------------------- //

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.uri.as_deref().unwrap_or(""), self.name)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (None, None) => Ok(()),
            (Some(a), Some(b)) if a == b => write!(f, "{a}"),
            (a, b) => {
                if let Some(a) = a {
                    write!(f, "{a}")?;
                }
                write!(f, ",")?;
                if let Some(b) = b {
                    write!(f, "{b}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RangeClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lo_exclusive {
            write!(f, "<")?;
        }
        let lit = |x: f64| {
            if self.integral { format!("{x}") } else { format!("{x:?}") }
        };
        match (self.lo, self.hi) {
            (Some(a), Some(b)) if a == b && !self.lo_exclusive && !self.hi_exclusive => {
                write!(f, "{}", lit(a))?
            }
            (a, b) => {
                if let Some(a) = a {
                    write!(f, "{}", lit(a))?;
                }
                write!(f, "..")?;
                if let Some(b) = b {
                    write!(f, "{}", lit(b))?;
                }
            }
        }
        if self.hi_exclusive {
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(p) => write!(f, "{}", p.name()),
            Type::Range(clauses) => {
                for (i, c) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Type::Regex(p) => write!(f, "{}", p.source),
            Type::Chars(b) => write!(f, "char[{b}]"),
            Type::Array { item: Some(item), bounds } => write!(f, "{item}[{bounds}]"),
            Type::Array { item: None, bounds } if bounds.is_any() => write!(f, "array"),
            Type::Array { item: None, bounds } => write!(f, "any[{bounds}]"),
            Type::Set { item, bounds } => write!(f, "{item}{{{bounds}}}"),
            Type::Tuple(items) => {
                write!(f, "[")?;
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "]")
            }
            Type::Union(u) => {
                write!(f, "[[")?;
                for (i, t) in u.members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "]]")
            }
            Type::Ref(r) => write!(f, "{r}"),
            Type::Object(obj) => {
                write!(f, "{{")?;
                for (i, m) in obj.members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match m {
                        Member::Prop(p) => match &p.presence {
                            Presence::Required => write!(f, "{}:{}", p.name, p.ty)?,
                            Presence::Optional => write!(f, "{}?:{}", p.name, p.ty)?,
                            Presence::Default(lit) => write!(f, "{}?{}:{}", p.name, lit, p.ty)?,
                        },
                        Member::Pattern(p) => write!(f, "{}:{}", p.pattern.source, p.ty)?,
                    }
                }
                write!(f, "}}")
            }
            Type::Switch(d) => write!(f, "{{@if:{{{}:{}}},@then:{}}}", d.trigger, d.trigger_ty, d.then),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_clause_exclusive_and_integral() {
        let c = RangeClause { lo: Some(0.0), hi: Some(10.0), lo_exclusive: true, hi_exclusive: true, integral: true };
        assert!(c.contains(5.0));
        assert!(!c.contains(0.0));
        assert!(!c.contains(10.0));
        assert!(!c.contains(5.5), "integral clause rejects fractions");
    }

    #[test]
    fn constraint_names_are_distinct_in_first_seen_order() {
        let mut c = Constraints::default();
        c.one.push(vec!["a".into(), "b".into()]);
        c.all.push(vec!["b".into(), "c".into()]);
        c.dep.insert("d".into(), vec!["a".into()]);
        assert_eq!(c.names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn prim_names_round_trip() {
        for (name, prim) in PRIM_NAMES {
            assert_eq!(Prim::from_name(name), Some(*prim));
            assert_eq!(prim.name(), *name);
        }
        assert_eq!(Prim::from_name("nope"), None);
    }
}
