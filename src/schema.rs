//! Schemas and schema sets.
//!
//! A schema is a JSON object of named types plus `@root`, `@id`, `@note`.
//! Adding a schema to a set prepares it completely: every type is parsed,
//! every external schema it mentions is fetched, and every `@extends` is
//! expanded. After that a set is read-only and freely shareable.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ReferenceError, Result, SchemaError};
use crate::extends;
use crate::grammar::parse_type;
use crate::ir::Type;
use crate::resolve::SchemaLoader;

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) id: Option<String>,
    pub(crate) root: Option<Type>,
    pub(crate) types: IndexMap<String, Type>,
    pub(crate) note: Option<String>,
}

impl Schema {
    /// Parse a schema document. `@extends` stays pending until the schema
    /// is added to a set.
    pub fn parse(v: &Value) -> std::result::Result<Schema, SchemaError> {
        let map = v
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(kind_name(v).to_string()))?;

        let mut schema = Schema::default();
        for (key, value) in map {
            match key.as_str() {
                "@id" => {
                    let id = value.as_str().ok_or_else(|| SchemaError::InvalidKey {
                        key: key.clone(),
                        reason: "expects a URI string".into(),
                    })?;
                    schema.id = Some(id.to_string());
                }
                "@note" => schema.note = value.as_str().map(String::from),
                "@root" => schema.root = Some(parse_type(value)?),
                k if k.starts_with('@') => {
                    return Err(SchemaError::InvalidKey {
                        key: key.clone(),
                        reason: "unknown schema directive".into(),
                    });
                }
                _ => {
                    schema.types.insert(key.clone(), parse_type(value)?);
                }
            }
        }

        if let Some(Type::Ref(r)) = &schema.root {
            let own = r.uri.is_none() || r.uri == schema.id;
            if own && r.is_root() {
                return Err(SchemaError::SelfRoot);
            }
        }
        Ok(schema)
    }

    /// A schema with no types, used when validating without one.
    pub fn empty() -> Schema {
        Schema::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// `@root` if present, else the only named type.
    pub fn root(&self) -> std::result::Result<&Type, SchemaError> {
        if let Some(root) = &self.root {
            return Ok(root);
        }
        match self.types.len() {
            0 => Err(SchemaError::NoRoot),
            1 => Ok(&self.types[0]),
            _ => Err(SchemaError::AmbiguousRoot(self.types.keys().cloned().collect())),
        }
    }

    /// `@root` followed by the named types, in declaration order.
    pub(crate) fn all_types(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.root
            .iter()
            .map(|t| ("@root", t))
            .chain(self.types.iter().map(|(k, t)| (k.as_str(), t)))
    }

    /// External schema URIs mentioned anywhere in this schema.
    pub(crate) fn external_uris(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (_, ty) in self.all_types() {
            for uri in ty.external_uris() {
                if self.id.as_deref() != Some(uri.as_str()) && !out.contains(&uri) {
                    out.push(uri);
                }
            }
        }
        out
    }
}

/// Prepared schemas. The first one is the default for root lookups;
/// cross-schema references match on `@id`.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: Vec<Arc<Schema>>,
}

impl SchemaSet {
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn first(&self) -> Option<&Schema> {
        self.schemas.first().map(|s| &**s)
    }

    pub fn get(&self, index: usize) -> Option<&Schema> {
        self.schemas.get(index).map(|s| &**s)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter().map(|s| &**s)
    }

    pub fn find(&self, uri: &str) -> Option<&Schema> {
        self.iter().find(|s| s.id() == Some(uri))
    }

    /// Prepare `doc` and append it, along with every external schema it
    /// (transitively) refers to that the set does not hold yet. Returns the
    /// index of `doc`'s schema.
    pub fn add(&mut self, doc: &Value, loader: &dyn SchemaLoader) -> Result<usize> {
        let schema = Schema::parse(doc)?;
        self.prepare(vec![schema], loader)
    }

    /// Fetch `uri` through `loader`, tag it with that `@id`, and prepare it.
    /// Returns the index of an already present schema without loading.
    pub fn load(&mut self, uri: &str, loader: &dyn SchemaLoader) -> Result<usize> {
        if let Some(i) = self.schemas.iter().position(|s| s.id() == Some(uri)) {
            return Ok(i);
        }
        let schema = fetch(uri, loader)?;
        self.prepare(vec![schema], loader)
    }

    /// Append the identified schemas of `other` that this set lacks.
    pub(crate) fn merge_from(&mut self, other: &SchemaSet) {
        for schema in &other.schemas {
            if let Some(id) = schema.id() {
                if self.find(id).is_none() {
                    self.schemas.push(Arc::clone(schema));
                }
            }
        }
    }

    fn prepare(&mut self, mut group: Vec<Schema>, loader: &dyn SchemaLoader) -> Result<usize> {
        let mut i = 0;
        while i < group.len() {
            for uri in group[i].external_uris() {
                let known = self.find(&uri).is_some() || group.iter().any(|s| s.id() == Some(uri.as_str()));
                if !known {
                    group.push(fetch(&uri, loader)?);
                }
            }
            i += 1;
        }

        extends::expand_group(self, &mut group)?;

        let index = self.schemas.len();
        for schema in group {
            tracing::debug!(
                id = schema.id().unwrap_or("(anonymous)"),
                types = schema.types.len(),
                "schema prepared"
            );
            self.schemas.push(Arc::new(schema));
        }
        Ok(index)
    }
}

/// A set that grows as validations pull in external schemas. Each URI is
/// fetched and prepared once; readers work on cheap snapshots.
#[derive(Debug, Default)]
pub(crate) struct SharedSet(RwLock<SchemaSet>);

impl SharedSet {
    pub(crate) fn snapshot(&self) -> SchemaSet {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Snapshot holding every schema in `uris`, loading the missing ones.
    pub(crate) fn ensure(&self, uris: &[String], loader: &dyn SchemaLoader) -> Result<SchemaSet> {
        let snap = self.snapshot();
        if uris.iter().all(|uri| snap.find(uri).is_some()) {
            return Ok(snap);
        }
        let mut set = self.0.write().unwrap_or_else(PoisonError::into_inner);
        for uri in uris {
            set.load(uri, loader)?;
        }
        Ok(set.clone())
    }
}

fn fetch(uri: &str, loader: &dyn SchemaLoader) -> Result<Schema> {
    tracing::debug!(uri, "fetching external schema");
    let doc = loader.load(uri).map_err(|reason| ReferenceError::Load {
        uri: uri.to_string(),
        reason,
    })?;
    let mut schema = Schema::parse(&doc)?;
    if schema.id.as_deref() != Some(uri) {
        schema.id = Some(uri.to_string());
    }
    Ok(schema)
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resolve::NoLoader;
    use serde_json::json;

    #[test]
    fn root_selection() {
        let s = Schema::parse(&json!({"@note": "x", "A": "int"})).unwrap();
        assert!(matches!(s.root(), Ok(Type::Prim(_))));

        let s = Schema::parse(&json!({"@root": "#B", "A": "int", "B": "string"})).unwrap();
        assert!(matches!(s.root(), Ok(Type::Ref(_))));

        let s = Schema::parse(&json!({"A": "int", "B": "string"})).unwrap();
        assert!(matches!(s.root(), Err(SchemaError::AmbiguousRoot(names)) if names == ["A", "B"]));

        let s = Schema::parse(&json!({"@id": "urn:x"})).unwrap();
        assert!(matches!(s.root(), Err(SchemaError::NoRoot)));
    }

    #[test]
    fn malformed_documents() {
        assert!(matches!(Schema::parse(&json!([])), Err(SchemaError::NotAnObject(_))));
        assert!(matches!(Schema::parse(&json!({"@root": "#"})), Err(SchemaError::SelfRoot)));
        assert!(matches!(
            Schema::parse(&json!({"@id": "urn:a", "@root": "urn:a#"})),
            Err(SchemaError::SelfRoot)
        ));
        assert!(matches!(Schema::parse(&json!({"@bogus": 1})), Err(SchemaError::InvalidKey { .. })));
    }

    #[test]
    fn externals_are_fetched_transitively() {
        let loader = |uri: &str| -> std::result::Result<Value, String> {
            match uri {
                "urn:b" => Ok(json!({"B": "urn:c#C"})),
                "urn:c" => Ok(json!({"C": "string"})),
                _ => Err(format!("unknown {uri}")),
            }
        };
        let mut set = SchemaSet::default();
        let i = set.add(&json!({"A": "urn:b#B[]"}), &loader).unwrap();
        assert_eq!(i, 0);
        assert_eq!(set.len(), 3);
        assert!(set.find("urn:c").is_some());

        assert_eq!(set.load("urn:b", &loader).unwrap(), 1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn shared_sets_fetch_each_uri_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let loader = |uri: &str| -> std::result::Result<Value, String> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            match uri {
                "urn:geo" => Ok(json!({"P": ["number", "number"]})),
                _ => Err(format!("unknown {uri}")),
            }
        };
        let shared = SharedSet::default();
        let uris = vec!["urn:geo".to_string()];
        for _ in 0..3 {
            let snap = shared.ensure(&uris, &loader).unwrap();
            assert!(snap.find("urn:geo").is_some());
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert!(shared.ensure(&["urn:nope".to_string()], &loader).is_err());
        assert_eq!(shared.snapshot().len(), 1);
    }

    #[test]
    fn failed_fetch_is_a_reference_error() {
        let mut set = SchemaSet::default();
        let err = set.add(&json!({"A": "urn:missing#X"}), &NoLoader).unwrap_err();
        assert!(matches!(err, Error::Reference(ReferenceError::Load { .. })));
        assert!(set.is_empty());
    }
}
