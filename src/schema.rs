//! Structural validation of output records against a JSON Schema (draft 2020-12).

use jsonschema::Validator;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{parse_json_text, read_json_file};
use crate::error::{LookupError, Result};

const BUNDLED_SCHEMA: &str = include_str!("../data/schemas/mb-album-v1.json");

/// One validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaViolation {
    pub message: String,
    /// JSON pointer of the offending value ("" for the document root)
    pub path: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{} at {}", self.message, path)
    }
}

pub struct RecordSchema {
    validator: Validator,
}

impl RecordSchema {
    /// Schema shipped with the crate.
    pub fn bundled() -> Result<Self> {
        let path = Path::new("<bundled>/mb-album-v1.json");
        Self::from_value(parse_json_text(BUNDLED_SCHEMA, path)?, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let schema = read_json_file(path)?;
        Self::from_value(schema, path)
    }

    /// Compile a schema. It must itself validate against the draft 2020-12 meta-schema.
    pub fn from_value(schema: Value, path: &Path) -> Result<Self> {
        let validator = jsonschema::draft202012::new(&schema).map_err(|e| LookupError::Schema {
            path: PathBuf::from(path),
            reason: e.to_string(),
        })?;
        Ok(Self { validator })
    }

    /// All violations, ordered by path.
    pub fn validate(&self, instance: &Value) -> Vec<SchemaViolation> {
        let mut errors: Vec<SchemaViolation> = self
            .validator
            .iter_errors(instance)
            .map(|e| SchemaViolation {
                message: e.to_string(),
                path: e.instance_path.to_string(),
            })
            .collect();
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        errors
    }
}
