//! Validator for SJOT-style compact JSON schemas.
//!
//! A schema is a JSON object mapping type names to types written in a terse
//! grammar embedded in JSON strings, arrays and objects:
//!
//! ```
//! use serde_json::json;
//!
//! let schema = json!({
//!     "@root": "#Person",
//!     "Person": {"name": "string", "age?0": "0..150", "tags?": "string{}"}
//! });
//! let out = sjot::validate(&json!({"name": "Ada", "tags": ["b", "a"]}), None, Some(&schema)).unwrap();
//! assert_eq!(out, json!({"name": "Ada", "tags": ["a", "b"], "age": 0}));
//! assert!(!sjot::valid(&json!({"age": 3}), None, Some(&schema)));
//! ```
//!
//! Schemas are prepared once (`Sjot::add_schema`): parsed, external
//! references fetched through a `SchemaLoader`, `@extends` expanded. A
//! prepared `Sjot` can be shared across threads. Schemas a validation has
//! to fetch are prepared once and kept for later validations.

pub mod config;
pub mod constraints;
pub mod defaults;
pub mod error;
pub mod format;
pub mod grammar;
pub mod ir;
pub mod order;
pub mod resolve;
pub mod schema;

mod check;
mod extends;
mod matcher;
mod union;

use std::borrow::Cow;

use serde_json::Value;

pub use config::Options;
pub use error::{Error, ReferenceError, Result, SchemaError, ValidationError};
pub use ir::Type;
pub use resolve::{FileLoader, NoLoader, SchemaLoader};
pub use schema::{Schema, SchemaSet};

use ir::Ref;
use matcher::Matcher;
use schema::SharedSet;

/// A prepared schema set plus the loader and options it validates with.
pub struct Sjot {
    set: SchemaSet,
    loaded: SharedSet,
    loader: Box<dyn SchemaLoader>,
    options: Options,
}

impl Default for Sjot {
    fn default() -> Self {
        Sjot::new()
    }
}

impl Sjot {
    pub fn new() -> Self {
        Sjot {
            set: SchemaSet::default(),
            loaded: SharedSet::default(),
            loader: Box::new(NoLoader),
            options: Options::default(),
        }
    }

    pub fn with_loader(mut self, loader: impl SchemaLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.set
    }

    /// Prepare and append a schema. The first schema added is the default
    /// for root lookups.
    pub fn add_schema(&mut self, schema: &Value) -> Result<usize> {
        self.set.add(schema, &*self.loader)
    }

    /// Fetch a schema through the loader and append it under `uri`.
    pub fn load(&mut self, uri: &str) -> Result<usize> {
        self.set.load(uri, &*self.loader)
    }

    /// Validate `data` against `type_ref` and return the transformed copy:
    /// defaults filled in, absent optionals removed, null items replaced,
    /// sets sorted. `data` itself is left alone.
    ///
    /// `type_ref` is `None`, `"#"` or `"@root"` for the default schema's
    /// root, `"#name"`, `"URI#name"`, or any other type expression.
    pub fn validate(&self, data: &Value, type_ref: Option<&str>) -> Result<Value> {
        let mut out = data.clone();
        self.validate_in_place(&mut out, type_ref)?;
        Ok(out)
    }

    /// `validate`, rewriting `data` directly.
    pub fn validate_in_place(&self, data: &mut Value, type_ref: Option<&str>) -> Result<()> {
        let root = matches!(type_ref, None | Some("#") | Some("@root"));
        let ty = match type_ref {
            Some(expr) if !root => grammar::parse_type(&Value::String(expr.to_string()))?,
            _ => Type::Ref(Ref::local("")),
        };

        let missing: Vec<String> =
            ty.external_uris().into_iter().filter(|uri| self.set.find(uri).is_none()).collect();
        let mut set = Cow::Borrowed(&self.set);
        if !missing.is_empty() {
            set.to_mut().merge_from(&self.loaded.ensure(&missing, &*self.loader)?);
        }

        let empty = Schema::empty();
        let cur = self.set.first().unwrap_or(&empty);
        let ty = if root && self.set.is_empty() { Type::any() } else { ty };
        Matcher::new(&set, &*self.loader, &self.options)
            .sharing(&self.loaded)
            .run(data, &ty, cur)
    }

    /// `validate` that reports any failure as `false`.
    pub fn valid(&self, data: &Value, type_ref: Option<&str>) -> bool {
        self.validate(data, type_ref).is_ok()
    }

    /// Static checks over every schema in the set.
    pub fn check(&self) -> Result<()> {
        check::check_set(&self.set, &*self.loader, &self.options)
    }
}

/// Validate `data` against `type_ref` in `schema` (or against `any` when no
/// schema is given) and return the transformed copy.
pub fn validate(data: &Value, type_ref: Option<&str>, schema: Option<&Value>) -> Result<Value> {
    let mut sjot = Sjot::new();
    if let Some(schema) = schema {
        sjot.add_schema(schema)?;
    }
    sjot.validate(data, type_ref)
}

pub fn valid(data: &Value, type_ref: Option<&str>, schema: Option<&Value>) -> bool {
    validate(data, type_ref, schema).is_ok()
}

/// Prepare `schema` and run every static check on it.
pub fn check(schema: &Value) -> Result<()> {
    let mut sjot = Sjot::new();
    sjot.add_schema(schema)?;
    sjot.check()
}
