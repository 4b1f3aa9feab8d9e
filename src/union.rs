//! Union disambiguation.
//!
//! Each union literal gets a table, built once: every member is stripped of
//! its array/set suffixes (one depth level per suffix, following references)
//! and its base is classified into one kind. A bucket per depth holds at most
//! one member per scalar kind, and object members partitioned by the
//! property names they declare. Data is then routed to a single member by
//! looking at its own array depth and the kind of what sits at the bottom,
//! so no alternative is ever tried and rolled back.
//!
//! An `any` at depth `n` (or an untyped array/tuple, which is `any` one
//! level down) makes every depth `>= n` ambiguous: it becomes the cut, and
//! no other member may live at or below it.

use std::ptr;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::ir::{Prim, Ref, Type, Union};
use crate::matcher::{Matcher, Trail};
use crate::resolve::resolve;
use crate::schema::{Schema, SchemaSet};

/// Per-depth classification of a union's members. Members are indices into
/// `Union::members`.
#[derive(Debug, Clone, Default)]
pub struct UnionTable {
    buckets: Vec<Bucket>,
    depths: Vec<(usize, usize)>, // (depth, member) per classified base
    cut: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default)]
struct Bucket {
    null: Option<usize>,
    boolean: Option<usize>,
    number: Option<usize>,
    string: Option<usize>,
    object: ObjectSlot,
}

#[derive(Debug, Clone, Default)]
struct ObjectSlot {
    discriminators: Vec<Discriminator>,
    catch_all: Option<usize>,
    props: IndexMap<String, usize>,
    plain: Vec<usize>,
}

/// `@if`/`@then` member: selected when `trigger` is present and its value
/// matches `ty`.
#[derive(Debug, Clone)]
struct Discriminator {
    trigger: String,
    ty: Type,
    member: usize,
}

#[derive(Debug)]
enum Kind {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Atom,
    CatchAll,
    Plain(Vec<String>),
    Switch { trigger: String, ty: Type },
}

/// The table for `u`, building it on first use.
pub(crate) fn table<'u>(set: &SchemaSet, cur: &Schema, u: &'u Union) -> Result<&'u UnionTable> {
    u.table.get_or_try_init(|| build(set, cur, u))
}

fn build(set: &SchemaSet, cur: &Schema, u: &Union) -> Result<UnionTable> {
    let mut t = UnionTable::default();
    for (i, member) in u.members.iter().enumerate() {
        let mut entries = Vec::new();
        strip(set, cur, cur, member, u, 0, Vec::new(), &mut entries)?;
        for (depth, kind) in entries {
            tracing::trace!(member = %member, depth, kind = ?kind, "union member classified");
            t.place(u, i, depth, kind)?;
        }
    }
    Ok(t)
}

impl UnionTable {
    fn place(&mut self, u: &Union, i: usize, depth: usize, kind: Kind) -> Result<()> {
        if let Some((cd, cm)) = self.cut {
            if depth >= cd && cm != i {
                return Err(conflict(u, cm, i, format!("depth {cd} and below are taken by `any`")));
            }
        }
        self.depths.push((depth, i));
        if let Kind::Any = kind {
            if let Some(&(_, j)) = self.depths.iter().find(|(d, j)| *d >= depth && *j != i) {
                return Err(conflict(u, j, i, format!("`any` at depth {depth} overlaps")));
            }
            self.cut = Some((depth, i));
            return Ok(());
        }

        if self.buckets.len() <= depth {
            self.buckets.resize_with(depth + 1, Bucket::default);
        }
        let b = &mut self.buckets[depth];
        match kind {
            Kind::Any => {}
            Kind::Null => claim(u, &mut b.null, i, "null", depth)?,
            Kind::Boolean => claim(u, &mut b.boolean, i, "boolean", depth)?,
            Kind::Number => claim(u, &mut b.number, i, "numeric", depth)?,
            Kind::String => claim(u, &mut b.string, i, "string", depth)?,
            Kind::Atom => {
                claim(u, &mut b.boolean, i, "boolean", depth)?;
                claim(u, &mut b.number, i, "numeric", depth)?;
                claim(u, &mut b.string, i, "string", depth)?;
            }
            Kind::CatchAll => {
                let slot = &mut b.object;
                if let Some(j) = slot.catch_all.or(slot.plain.first().copied()).filter(|j| *j != i) {
                    return Err(conflict(u, j, i, format!("catch-all object at depth {depth}")));
                }
                slot.catch_all = Some(i);
            }
            Kind::Plain(names) => {
                let slot = &mut b.object;
                if let Some(j) = slot.catch_all.filter(|j| *j != i) {
                    return Err(conflict(u, j, i, format!("catch-all object at depth {depth}")));
                }
                for name in names {
                    match slot.props.get(&name) {
                        Some(j) if *j != i => {
                            return Err(conflict(u, *j, i, format!("both declare property `{name}`")));
                        }
                        _ => {
                            slot.props.insert(name, i);
                        }
                    }
                }
                if !slot.plain.contains(&i) {
                    slot.plain.push(i);
                }
            }
            Kind::Switch { trigger, ty } => {
                b.object.discriminators.push(Discriminator { trigger, ty, member: i });
            }
        }
        Ok(())
    }
}

/// Peel suffixes and references off `ty` down to classifiable bases,
/// pushing one `(depth, kind)` entry per base. A union met below depth 0
/// (an array of a union) contributes an entry for each of its members.
#[allow(clippy::too_many_arguments)]
fn strip<'a>(
    set: &'a SchemaSet,
    cur: &'a Schema,
    scope: &'a Schema,
    ty: &'a Type,
    u: &Union,
    depth: usize,
    seen: Vec<(Option<String>, Ref)>,
    out: &mut Vec<(usize, Kind)>,
) -> Result<()> {
    let mut depth = depth;
    let mut ty = ty;
    let mut scope = scope;
    let mut seen = seen;

    loop {
        let kind = match ty {
            Type::Ref(r) => {
                let key = (scope.id().map(String::from), r.clone());
                if seen.contains(&key) {
                    out.push((depth, Kind::Any));
                    return Ok(());
                }
                seen.push(key);
                (ty, scope) = resolve(set, scope, r)?;
                continue;
            }
            Type::Array { item: Some(item), .. } | Type::Set { item, .. } => {
                depth += 1;
                ty = &**item;
                continue;
            }
            Type::Array { item: None, .. } | Type::Tuple(_) | Type::Prim(Prim::Array) => {
                out.push((depth + 1, Kind::Any));
                return Ok(());
            }
            Type::Union(_) if depth == 0 => return Err(SchemaError::NestedUnion(render(u)).into()),
            Type::Union(inner) => {
                for m in &inner.members {
                    strip(set, cur, scope, m, u, depth, seen.clone(), out)?;
                }
                return Ok(());
            }
            Type::Prim(Prim::Any) => Kind::Any,
            Type::Prim(Prim::Null) => Kind::Null,
            Type::Prim(Prim::Atom) => Kind::Atom,
            Type::Prim(Prim::Object) => Kind::CatchAll,
            Type::Prim(p) if p.is_boolean_like() => Kind::Boolean,
            Type::Prim(p) if p.is_numeric_like() => Kind::Number,
            Type::Prim(_) | Type::Regex(_) | Type::Chars(_) => Kind::String,
            Type::Range(_) => Kind::Number,
            Type::Object(obj) => {
                let names: Vec<String> = obj.property_names().map(String::from).collect();
                if obj.has_patterns() || names.is_empty() {
                    Kind::CatchAll
                } else {
                    Kind::Plain(names)
                }
            }
            Type::Switch(d) => {
                let mut ty = d.trigger_ty.clone();
                if !ptr::eq(scope, cur) {
                    if let Some(id) = scope.id() {
                        ty.qualify(id);
                    }
                }
                Kind::Switch { trigger: d.trigger.clone(), ty }
            }
        };
        out.push((depth, kind));
        return Ok(());
    }
}

fn claim(u: &Union, slot: &mut Option<usize>, i: usize, what: &str, depth: usize) -> Result<()> {
    match slot {
        Some(j) if *j == i => Ok(()),
        Some(j) => Err(conflict(u, *j, i, format!("both are {what} at depth {depth}"))),
        None => {
            *slot = Some(i);
            Ok(())
        }
    }
}

fn conflict(u: &Union, a: usize, b: usize, why: String) -> crate::error::Error {
    SchemaError::UnionConflict {
        union: render(u),
        reason: format!("`{}` and `{}`: {why}", u.members[a], u.members[b]),
    }
    .into()
}

fn render(u: &Union) -> String {
    let members: Vec<String> = u.members.iter().map(ToString::to_string).collect();
    format!("[[{}]]", members.join(","))
}

impl UnionTable {
    /// The member `data` must be validated against, if any.
    fn select(&self, m: &Matcher<'_>, data: &Value, cur: &Schema) -> Result<Option<usize>> {
        let mut v = data;
        let mut depth = 0;
        loop {
            if let Some((cd, cm)) = self.cut {
                if depth >= cd {
                    return Ok(Some(cm));
                }
            }
            match v {
                Value::Array(xs) => match xs.first() {
                    Some(x) => {
                        v = x;
                        depth += 1;
                    }
                    None => return Ok(self.depths.iter().find(|(d, _)| *d > depth).map(|&(_, i)| i)),
                },
                _ => break,
            }
        }

        let Some(b) = self.buckets.get(depth) else {
            return Ok(None);
        };
        Ok(match v {
            Value::Null => b.null,
            Value::Bool(_) => b.boolean,
            Value::Number(_) => b.number,
            Value::String(_) => b.string,
            Value::Object(map) => b.object.select(m, map, cur)?,
            Value::Array(_) => None,
        })
    }
}

impl ObjectSlot {
    fn select(&self, m: &Matcher<'_>, map: &Map<String, Value>, cur: &Schema) -> Result<Option<usize>> {
        for d in &self.discriminators {
            if let Some(v) = map.get(&d.trigger) {
                if m.accepts(v, &d.ty, cur)? {
                    return Ok(Some(d.member));
                }
            }
        }
        if self.catch_all.is_some() {
            return Ok(self.catch_all);
        }
        if let Some(i) = map.keys().find_map(|k| self.props.get(k)) {
            return Ok(Some(*i));
        }
        Ok(match self.plain.as_slice() {
            [only] => Some(*only),
            _ => None,
        })
    }
}

/// Validate `data` against the one member of `u` it routes to.
pub(crate) fn dispatch(
    m: &Matcher<'_>,
    trail: &mut Trail,
    data: &mut Value,
    u: &Union,
    cur: &Schema,
) -> Result<()> {
    let t = table(m.set, cur, u)?;
    match t.select(m, data, cur)? {
        Some(i) => m.match_value(trail, data, &u.members[i], cur),
        None => Err(trail.fail(format!("value does not match any member of {}", render(u)))),
    }
}
