//! Tool input schemas.
//!
//! Fixed-shape tools derive their schema from a Rust input type via
//! `schemars`. Tools whose fields are only known at runtime (a whitelisted
//! set of table columns) use a [`RecordShape`] instead, which yields both
//! the schema and the matching validation.

use schemars::JsonSchema;
use serde_json::{Map, Value};

/// JSON schema of `T`, stripped of the meta keys model providers reject.
pub fn input_schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: String,
    pub required: bool,
}

/// A flat record of named fields, some of them mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    fields: Vec<FieldShape>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("Input must be a JSON object")]
    NotAnObject,

    #[error("Missing required columns: {0:?}")]
    MissingRequired(Vec<String>),
}

impl RecordShape {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, required)| FieldShape {
                    name: name.into(),
                    required,
                })
                .collect(),
        }
    }

    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    /// Machine-readable descriptor (JSON schema) of the record.
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.clone(),
                serde_json::json!({
                    "type": ["string", "number", "integer", "boolean", "null"],
                    "description": format!("Value for column {}", field.name),
                }),
            );
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Keep only known fields of `input`, and fail when a required field is
    /// absent or null. Unknown keys are dropped silently.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, ShapeError> {
        let object = input.as_object().ok_or(ShapeError::NotAnObject)?;

        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.required && object.get(&f.name).is_none_or(Value::is_null))
            .map(|f| f.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ShapeError::MissingRequired(missing));
        }

        Ok(self
            .fields
            .iter()
            .filter_map(|f| object.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect())
    }
}
