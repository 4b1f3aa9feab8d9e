//! Recursive matcher: does a JSON value inhabit a type?
//!
//! Dispatches on the type first (references, unions, discriminated
//! alternatives, `any`), then on the kind of the data. Matching rewrites the
//! value it is given: absent defaults are inserted, absent optionals are
//! removed, null items are replaced by their item type's default, and sets
//! are sorted. Callers that need the input untouched match a copy.

use std::fmt;

use serde_json::{Map, Number, Value};

use crate::config::{Options, SELF_SCHEMA_KEY};
use crate::constraints;
use crate::defaults;
use crate::error::{Error, ReferenceError, Result, SchemaError, ValidationError};
use crate::format;
use crate::grammar;
use crate::ir::{Bounds, Discriminated, Member, ObjectType, Presence, Prim, Property, Ref, Type};
use crate::order::cmp_values;
use crate::resolve::{SchemaLoader, resolve};
use crate::schema::{Schema, SchemaSet, SharedSet};
use crate::union;

#[derive(Clone, Copy)]
pub(crate) struct Matcher<'a> {
    pub(crate) set: &'a SchemaSet,
    loader: &'a dyn SchemaLoader,
    options: &'a Options,
    shared: Option<&'a SharedSet>,
}

/// Where the matcher is: data path, type path, and data depth.
#[derive(Debug, Clone, Default)]
pub(crate) struct Trail {
    diagnostics: bool,
    data: Vec<String>,
    types: Vec<String>,
    depth: usize,
    sealed: Option<usize>,     // data depth at which an embedded schema took over
}

impl Trail {
    pub(crate) fn new(diagnostics: bool) -> Self {
        Trail { diagnostics, ..Trail::default() }
    }

    fn enter_key(&mut self, key: &str) {
        self.depth += 1;
        if self.diagnostics {
            self.data.push(key.replace('~', "~0").replace('/', "~1"));
        }
    }

    fn enter_index(&mut self, i: usize) {
        self.depth += 1;
        if self.diagnostics {
            self.data.push(i.to_string());
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
        if self.diagnostics {
            self.data.pop();
        }
    }

    fn enter_type(&mut self, seg: &dyn fmt::Display) {
        if self.diagnostics {
            self.types.push(seg.to_string());
        }
    }

    fn leave_type(&mut self) {
        if self.diagnostics {
            self.types.pop();
        }
    }

    pub(crate) fn fail(&self, message: impl Into<String>) -> Error {
        let (data_path, type_path) = if self.diagnostics {
            (self.data.iter().map(|s| format!("/{s}")).collect(), self.types.join("/"))
        } else {
            (String::new(), String::new())
        };
        ValidationError { data_path, type_path, message: message.into() }.into()
    }
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(set: &'a SchemaSet, loader: &'a dyn SchemaLoader, options: &'a Options) -> Self {
        Matcher { set, loader, options, shared: None }
    }

    /// Keep schemas fetched for embedded `@sjot` types in `shared`.
    pub(crate) fn sharing(self, shared: &'a SharedSet) -> Self {
        Matcher { shared: Some(shared), ..self }
    }

    /// This matcher's set plus every schema in `uris`.
    fn with_externals(&self, uris: &[String]) -> Result<SchemaSet> {
        let mut set = self.set.clone();
        match self.shared {
            Some(shared) => {
                let missing: Vec<String> = uris.iter().filter(|uri| set.find(uri).is_none()).cloned().collect();
                if !missing.is_empty() {
                    set.merge_from(&shared.ensure(&missing, self.loader)?);
                }
            }
            None => {
                for uri in uris {
                    set.load(uri, self.loader)?;
                }
            }
        }
        Ok(set)
    }

    /// Match `data` against `ty`, read in the scope of `cur`.
    pub(crate) fn run(&self, data: &mut Value, ty: &Type, cur: &Schema) -> Result<()> {
        let mut trail = Trail::new(self.options.diagnostics);
        self.match_value(&mut trail, data, ty, cur)
    }

    /// Like `run` on a scratch copy, with mismatches reported as `false`.
    /// Schema and reference errors still propagate.
    pub(crate) fn accepts(&self, data: &Value, ty: &Type, cur: &Schema) -> Result<bool> {
        let mut scratch = data.clone();
        let mut trail = Trail::new(false);
        match self.match_value(&mut trail, &mut scratch, ty, cur) {
            Ok(()) => Ok(true),
            Err(Error::Validation(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn match_value(&self, trail: &mut Trail, data: &mut Value, ty: &Type, cur: &Schema) -> Result<()> {
        match ty {
            Type::Ref(r) => {
                let (target, scope) = resolve(self.set, cur, r)?;
                trail.enter_type(r);
                self.match_value(trail, data, target, scope)?;
                trail.leave_type();
                Ok(())
            }
            Type::Union(u) => union::dispatch(self, trail, data, u, cur),
            Type::Switch(d) => self.match_switch(trail, data, d, cur),
            Type::Prim(Prim::Any) => self.match_embedded(trail, data, cur),
            Type::Prim(Prim::Object) if data.is_object() => self.match_embedded(trail, data, cur),
            _ => match data {
                Value::Null => match ty {
                    Type::Prim(Prim::Null) => Ok(()),
                    _ => Err(mismatch(trail, ty, data)),
                },
                Value::Bool(b) => {
                    let ok = match ty {
                        Type::Prim(Prim::Boolean | Prim::Atom) => true,
                        Type::Prim(Prim::True) => *b,
                        Type::Prim(Prim::False) => !*b,
                        _ => false,
                    };
                    if ok { Ok(()) } else { Err(mismatch(trail, ty, data)) }
                }
                Value::Number(n) => {
                    if number_matches(n, ty) { Ok(()) } else { Err(mismatch(trail, ty, data)) }
                }
                Value::String(s) => {
                    if string_matches(s, ty) { Ok(()) } else { Err(mismatch(trail, ty, data)) }
                }
                Value::Array(_) => self.match_array(trail, data, ty, cur),
                Value::Object(map) => match ty {
                    Type::Object(obj) => self.match_object(trail, map, obj, cur),
                    _ => Err(mismatch(trail, ty, data)),
                },
            },
        }
    }

    fn match_array(&self, trail: &mut Trail, data: &mut Value, ty: &Type, cur: &Schema) -> Result<()> {
        let Value::Array(xs) = data else {
            return Err(mismatch(trail, ty, data));
        };
        match ty {
            Type::Prim(Prim::Array) => Ok(()),
            Type::Array { item, bounds } => {
                check_len(trail, *bounds, xs.len())?;
                match item {
                    Some(item) => self.match_items(trail, xs, item, cur),
                    None => Ok(()),
                }
            }
            Type::Tuple(items) => {
                if xs.len() != items.len() {
                    return Err(trail.fail(format!(
                        "expected a tuple of {} items, got {}",
                        items.len(),
                        xs.len()
                    )));
                }
                for (i, (x, t)) in xs.iter_mut().zip(items).enumerate() {
                    self.fill_null(x, t, cur)?;
                    trail.enter_index(i);
                    self.match_value(trail, x, t, cur)?;
                    trail.leave();
                }
                Ok(())
            }
            Type::Set { item, bounds } => {
                check_len(trail, *bounds, xs.len())?;
                self.match_items(trail, xs, item, cur)?;
                xs.sort_by(cmp_values);
                if let Some(w) = xs.windows(2).find(|w| cmp_values(&w[0], &w[1]).is_eq()) {
                    return Err(trail.fail(format!("duplicate set element {}", w[0])));
                }
                Ok(())
            }
            _ => Err(mismatch(trail, ty, data)),
        }
    }

    fn match_items(&self, trail: &mut Trail, xs: &mut [Value], item: &Type, cur: &Schema) -> Result<()> {
        for (i, x) in xs.iter_mut().enumerate() {
            self.fill_null(x, item, cur)?;
            trail.enter_index(i);
            self.match_value(trail, x, item, cur)?;
            trail.leave();
        }
        Ok(())
    }

    /// Replace a null item by its type's default when the type rejects null.
    fn fill_null(&self, x: &mut Value, item: &Type, cur: &Schema) -> Result<()> {
        if !x.is_null() || self.accepts(x, item, cur)? {
            return Ok(());
        }
        if let Some(v) = defaults::materialize(self.set, cur, item, "null")? {
            *x = v;
        }
        Ok(())
    }

    fn match_object(
        &self,
        trail: &mut Trail,
        map: &mut Map<String, Value>,
        obj: &ObjectType,
        cur: &Schema,
    ) -> Result<()> {
        for member in &obj.members {
            match member {
                Member::Prop(p) => self.match_property(trail, map, p, cur)?,
                Member::Pattern(pp) => {
                    let keys: Vec<String> = map.keys().filter(|k| pp.pattern.is_match(k)).cloned().collect();
                    for k in keys {
                        if let Some(v) = map.get_mut(&k) {
                            trail.enter_key(&k);
                            trail.enter_type(&pp.pattern.source);
                            self.match_value(trail, v, &pp.ty, cur)?;
                            trail.leave_type();
                            trail.leave();
                        }
                    }
                }
            }
        }

        if let Err(msg) = constraints::check_presence(&obj.constraints, map) {
            return Err(trail.fail(msg));
        }

        if obj.final_ {
            let declared = |k: &str| {
                obj.members.iter().any(|m| match m {
                    Member::Prop(p) => p.name == k,
                    Member::Pattern(pp) => pp.pattern.is_match(k),
                })
            };
            if let Some(k) = map.keys().find(|k| k.as_str() != SELF_SCHEMA_KEY && !declared(k.as_str())) {
                return Err(trail.fail(format!("unexpected property `{k}`")));
            }
        }
        Ok(())
    }

    fn match_property(
        &self,
        trail: &mut Trail,
        map: &mut Map<String, Value>,
        p: &Property,
        cur: &Schema,
    ) -> Result<()> {
        let present = map.get(&p.name).is_some_and(|v| !v.is_null());
        match (&p.presence, present) {
            (Presence::Required, _) | (_, true) => {}
            (Presence::Optional, false) => {
                map.shift_remove(&p.name);
                return Ok(());
            }
            (Presence::Default(literal), false) => match defaults::materialize(self.set, cur, &p.ty, literal)? {
                Some(v) => {
                    map.insert(p.name.clone(), v);
                }
                None => {
                    tracing::warn!(property = %p.name, literal = %literal, ty = %p.ty, "default has no representation; property left absent");
                    map.shift_remove(&p.name);
                    return Ok(());
                }
            },
        }

        let Some(v) = map.get_mut(&p.name) else {
            return Err(trail.fail(format!("missing required property `{}`", p.name)));
        };
        trail.enter_key(&p.name);
        trail.enter_type(&p.name);
        self.match_value(trail, v, &p.ty, cur)?;
        trail.leave_type();
        trail.leave();
        Ok(())
    }

    fn match_switch(&self, trail: &mut Trail, data: &mut Value, d: &Discriminated, cur: &Schema) -> Result<()> {
        let trigger = data.as_object().and_then(|m| m.get(&d.trigger));
        let triggered = match trigger {
            Some(v) => self.accepts(v, &d.trigger_ty, cur)?,
            None => false,
        };
        if !triggered {
            return Err(trail.fail(format!("property `{}` does not match {}", d.trigger, d.trigger_ty)));
        }
        self.match_value(trail, data, &d.then, cur)
    }

    /// `any` and `object` accept everything, except that an object carrying
    /// `@sjot` must match the schema it carries.
    fn match_embedded(&self, trail: &mut Trail, data: &mut Value, cur: &Schema) -> Result<()> {
        if trail.sealed == Some(trail.depth) {
            return Ok(());
        }
        let embedded = match data {
            Value::Object(map) => match map.get(SELF_SCHEMA_KEY) {
                Some(v) => v.clone(),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        tracing::debug!(depth = trail.depth, "validating against embedded schema");

        let (set, ty, index) = match &embedded {
            Value::Object(_) => {
                let uris = Schema::parse(&embedded)?.external_uris();
                let mut set = self.with_externals(&uris)?;
                let index = set.add(&embedded, self.loader)?;
                (set, Type::Ref(Ref::local("")), Some(index))
            }
            Value::String(_) => {
                let ty = grammar::parse_type(&embedded)?;
                (self.with_externals(&ty.external_uris())?, ty, None)
            }
            other => {
                return Err(SchemaError::InvalidType {
                    ty: other.to_string(),
                    reason: format!("`{SELF_SCHEMA_KEY}` holds a schema object or a type reference"),
                }
                .into());
            }
        };

        let sub = Matcher { set: &set, ..*self };
        let scope = match index {
            Some(i) => set
                .get(i)
                .ok_or_else(|| ReferenceError::MissingSchema(SELF_SCHEMA_KEY.to_string()))?,
            None => cur,
        };
        let prev = trail.sealed.replace(trail.depth);
        let r = sub.match_value(trail, data, &ty, scope);
        trail.sealed = prev;
        r
    }
}

fn check_len(trail: &Trail, bounds: Bounds, len: usize) -> Result<()> {
    if bounds.contains(len) {
        Ok(())
    } else {
        Err(trail.fail(format!("length {len} outside [{bounds}]")))
    }
}

fn number_matches(n: &Number, ty: &Type) -> bool {
    match ty {
        Type::Prim(Prim::Number | Prim::Float | Prim::Double | Prim::Atom) => true,
        Type::Prim(Prim::Integer) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|x| x.fract() == 0.0),
        Type::Prim(p) => match p.integral_range() {
            Some((lo, hi)) => integral(n).is_some_and(|i| lo <= i && i <= hi),
            None => false,
        },
        Type::Range(clauses) => n.as_f64().is_some_and(|x| clauses.iter().any(|c| c.contains(x))),
        _ => false,
    }
}

fn integral(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.into());
    }
    let x = n.as_f64()?;
    (x.fract() == 0.0 && x.abs() < 1e30).then_some(x as i128)
}

fn string_matches(s: &str, ty: &Type) -> bool {
    match ty {
        Type::Prim(Prim::String | Prim::Atom) => true,
        Type::Prim(Prim::Char) => s.chars().count() == 1,
        Type::Prim(p) => format::pattern(*p).is_some_and(|re| re.is_match(s)),
        Type::Chars(bounds) => bounds.contains(s.chars().count()),
        Type::Regex(p) => p.is_match(s),
        _ => false,
    }
}

fn mismatch(trail: &Trail, ty: &Type, data: &Value) -> Error {
    let got = match data {
        Value::Array(xs) => format!("an array of {} items", xs.len()),
        Value::Object(_) => "an object".to_string(),
        scalar => scalar.to_string(),
    };
    trail.fail(format!("expected {ty}, got {got}"))
}
