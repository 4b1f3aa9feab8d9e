//! Type reference resolution and the schema loading capability.
//!
//! A reference is `[URI]#[name]`. An empty URI looks in the current schema,
//! an empty name selects the schema's root type. Reference chains are bounded
//! by construction: a named type that is itself a bare reference is rejected
//! instead of being followed.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ReferenceError, Result, SchemaError};
use crate::ir::{Ref, Type};
use crate::schema::{Schema, SchemaSet};

/// The only I/O boundary: turn a schema URI into schema JSON.
pub trait SchemaLoader: Send + Sync {
    fn load(&self, uri: &str) -> std::result::Result<Value, String>;
}

/// Refuses every URI. The default for `Sjot::new()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl SchemaLoader for NoLoader {
    fn load(&self, uri: &str) -> std::result::Result<Value, String> {
        Err(format!("no schema loader configured for `{uri}`"))
    }
}

/// Reads `file://` URIs and plain relative paths below `root`.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileLoader { root: root.into() }
    }

    fn path_for(&self, uri: &str) -> std::result::Result<PathBuf, String> {
        let rel = uri.strip_prefix("file://").unwrap_or(uri);
        if rel.contains("://") {
            return Err(format!("unsupported scheme in `{uri}`"));
        }
        let rel = Path::new(rel.trim_start_matches('/'));
        if rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(format!("`{uri}` escapes the loader root"));
        }
        Ok(self.root.join(rel))
    }
}

impl SchemaLoader for FileLoader {
    fn load(&self, uri: &str) -> std::result::Result<Value, String> {
        let path = self.path_for(uri)?;
        tracing::debug!(uri, path = %path.display(), "loading schema file");
        let text = std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
    }
}

impl<F> SchemaLoader for F
where
    F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync,
{
    fn load(&self, uri: &str) -> std::result::Result<Value, String> {
        self(uri)
    }
}

/// Resolve `r` from within `current`. Returns the referenced type together
/// with the schema it lives in, which becomes the scope for its own local
/// references.
pub fn resolve<'s>(
    set: &'s SchemaSet,
    current: &'s Schema,
    r: &Ref,
) -> Result<(&'s Type, &'s Schema)> {
    let schema = match r.uri.as_deref() {
        None => current,
        Some(uri) if current.id() == Some(uri) => current,
        Some(uri) => set
            .find(uri)
            .ok_or_else(|| ReferenceError::MissingSchema(uri.to_string()))?,
    };

    if r.is_root() {
        return Ok((schema.root()?, schema));
    }

    let ty = schema.get(&r.name).ok_or_else(|| ReferenceError::MissingType {
        name: r.name.clone(),
        schema: schema.id().unwrap_or("(anonymous)").to_string(),
    })?;
    if matches!(ty, Type::Ref(_)) {
        return Err(SchemaError::SpaghettiReference(r.name.clone()).into());
    }
    Ok((ty, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn set_of(schemas: &[Value]) -> SchemaSet {
        let mut set = SchemaSet::default();
        for s in schemas {
            set.add(s, &NoLoader).unwrap();
        }
        set
    }

    #[test]
    fn local_root_and_cross_schema() {
        let set = set_of(&[
            json!({"@id": "urn:a", "A": {"b": "urn:b#B"}}),
            json!({"@id": "urn:b", "B": "string", "C": "int"}),
        ]);
        let a = set.first().unwrap();

        let (ty, s) = resolve(&set, a, &Ref::local("A")).unwrap();
        assert!(matches!(ty, Type::Object(_)));
        assert_eq!(s.id(), Some("urn:a"));

        let (_, s) = resolve(&set, a, &Ref::local("")).unwrap();
        assert_eq!(s.id(), Some("urn:a"));

        let r = Ref { uri: Some("urn:b".into()), name: "C".into() };
        let (ty, s) = resolve(&set, a, &r).unwrap();
        assert!(matches!(ty, Type::Prim(crate::ir::Prim::Int)));
        assert_eq!(s.id(), Some("urn:b"));
    }

    #[test]
    fn failures() {
        let set = set_of(&[json!({"A": "#B", "B": "string"})]);
        let s = set.first().unwrap();
        assert!(matches!(
            resolve(&set, s, &Ref::local("A")),
            Err(Error::Schema(SchemaError::SpaghettiReference(_)))
        ));
        assert!(matches!(
            resolve(&set, s, &Ref::local("Nope")),
            Err(Error::Reference(ReferenceError::MissingType { .. }))
        ));
        assert!(matches!(
            resolve(&set, s, &Ref::local("")),
            Err(Error::Schema(SchemaError::AmbiguousRoot(_)))
        ));
        let r = Ref { uri: Some("urn:none".into()), name: "X".into() };
        assert!(matches!(resolve(&set, s, &r), Err(Error::Reference(ReferenceError::MissingSchema(_)))));
    }

    #[test]
    fn closures_and_files_load() {
        let loader = |uri: &str| -> std::result::Result<Value, String> {
            if uri == "urn:x" { Ok(json!({"X": "int"})) } else { Err("nope".into()) }
        };
        assert!(SchemaLoader::load(&loader, "urn:x").is_ok());
        assert!(NoLoader.load("urn:x").is_err());

        let files = FileLoader::new("/srv/schemas");
        assert_eq!(files.path_for("file:///a/b.json").unwrap(), PathBuf::from("/srv/schemas/a/b.json"));
        assert!(files.path_for("../etc/passwd").is_err());
        assert!(files.path_for("http://example.com/s.json").is_err());
    }
}
