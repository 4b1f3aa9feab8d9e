//! Error taxonomy: malformed schemas, unresolvable references, and data that
//! does not match. Each aborts the whole `validate()` call.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Error::Reference(_))
    }
}

/// The schema itself is malformed or self-contradictory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("schema must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("invalid type `{ty}`: {reason}")]
    InvalidType { ty: String, reason: String },

    #[error("invalid property key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("empty numeric range `{0}`")]
    EmptyRange(String),

    #[error("empty length bounds `{0}`")]
    EmptyBounds(String),

    #[error("spaghetti references not permitted: `#{0}` is itself a reference")]
    SpaghettiReference(String),

    #[error("schema has no root type")]
    NoRoot,

    #[error("schema root is ambiguous between {0:?}")]
    AmbiguousRoot(Vec<String>),

    #[error("@root may not refer to the root itself")]
    SelfRoot,

    #[error("union may not directly contain a union: {0}")]
    NestedUnion(String),

    #[error("union {union} is ambiguous: {reason}")]
    UnionConflict { union: String, reason: String },

    #[error("@extends `{0}` does not name an object type")]
    ExtendsNotObject(String),

    #[error("@extends `{0}` names a @final type")]
    ExtendsFinal(String),

    #[error("@extends `{base}` would override property `{property}`")]
    ExtendsOverride { base: String, property: String },

    #[error("@extends cycle through `{0}`")]
    ExtendsCycle(String),

    #[error("constraint {constraint} names `{property}`, which is not an optional property without default")]
    BadConstraint { constraint: String, property: String },

    #[error("object type {0} has unsatisfiable @one/@any/@all/@dep constraints")]
    Unsatisfiable(String),

    #[error("property `{property}` has default `{literal}` but type {ty} has no representable default")]
    NoDefault { property: String, literal: String, ty: String },

    #[error("property `{property}` default `{literal}` does not match its type: {reason}")]
    BadDefault { property: String, literal: String, reason: String },
}

/// A named type or external schema could not be found.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("missing type `{name}` in schema {schema}")]
    MissingType { name: String, schema: String },

    #[error("no schema with @id `{0}`")]
    MissingSchema(String),

    #[error("failed to load schema `{uri}`: {reason}")]
    Load { uri: String, reason: String },
}

/// The data does not match. Paths are empty when diagnostics are off.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub data_path: String,
    pub type_path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.data_path.is_empty(), self.type_path.is_empty()) {
            (true, true) => write!(f, "{}", self.message),
            _ => {
                let data = if self.data_path.is_empty() { "(root)" } else { &self.data_path };
                write!(f, "{data}: {}", self.message)?;
                if !self.type_path.is_empty() {
                    write!(f, " (at {})", self.type_path)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}
