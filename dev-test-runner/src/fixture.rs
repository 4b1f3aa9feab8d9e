use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One fixture file: a schema, what `check()` should say about it, and data
/// cases to validate against it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub note: Option<String>,
    pub schema: Value,
    /// Expected outcome of preparing and checking the schema.
    #[serde(default)]
    pub check: Outcome,
    #[serde(default)]
    pub cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub name: String,
    /// `#name`, `URI#name` or any type expression; the root when omitted.
    #[serde(rename = "type", default)]
    pub type_ref: Option<String>,
    pub data: Value,
    #[serde(default)]
    pub expect: Outcome,
    /// The transformed value, when `expect` is `ok`.
    #[serde(default)]
    pub output: Option<Value>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    #[default]
    Ok,
    SchemaError,
    ReferenceError,
    ValidationError,
}

impl Outcome {
    pub fn of<T>(r: &Result<T, sjot::Error>) -> Outcome {
        match r {
            Ok(_) => Outcome::Ok,
            Err(sjot::Error::Schema(_)) => Outcome::SchemaError,
            Err(sjot::Error::Reference(_)) => Outcome::ReferenceError,
            Err(sjot::Error::Validation(_)) => Outcome::ValidationError,
        }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}
