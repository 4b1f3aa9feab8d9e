use serde::Deserialize;

// ------------------------------- Policy ---------------------------------- //

/// Data key carrying an embedded, self-describing schema.
pub const SELF_SCHEMA_KEY: &str = "@sjot";

/// Constraint sets mentioning fewer names than this are trivially satisfiable.
pub const SAT_MIN_VARS: usize = 2;

/// Default cap on names enumerated by the satisfiability check (2^n assignments).
pub const SAT_MAX_VARS: usize = 20;

/// Validator options. Deserializable so hosts can keep them next to other
/// settings; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Record data and type paths in validation errors.
    pub diagnostics: bool,
    /// Constraint sets naming more properties than this are accepted without search.
    pub sat_max_vars: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            diagnostics: true,
            sat_max_vars: SAT_MAX_VARS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_options_fill_defaults() {
        let o: Options = serde_json::from_value(serde_json::json!({"diagnostics": false})).unwrap();
        assert!(!o.diagnostics);
        assert_eq!(o.sat_max_vars, SAT_MAX_VARS);
    }
}
