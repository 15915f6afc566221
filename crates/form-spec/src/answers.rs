use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::{Map, Value};

use crate::SchemaError;

/// Answer map keyed by element id. Never validated against a fixed shape.
pub type Answers = Map<String, Value>;

/// Parse an answer document; the top level must be a JSON object.
pub fn parse_answers(json: &str) -> Result<Answers, SchemaError> {
    match serde_json::from_str::<Value>(json).map_err(SchemaError::AnswersParse)? {
        Value::Object(map) => Ok(map),
        other => Err(SchemaError::AnswersNotObject(json_kind(&other))),
    }
}

/// Lenient variant used where a missing or broken document means "no answers yet".
pub fn answers_or_empty(value: &Value) -> Answers {
    value.as_object().cloned().unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A failed required-field or validation-rule check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub element_id: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(element_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            message: message.into(),
        }
    }
}

/// Submitted answers handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    pub answers: Answers,
}

impl AnswerSet {
    pub fn new(schema_id: Option<String>, answers: Answers) -> Self {
        Self { schema_id, answers }
    }

    /// Serializes the answer set as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    /// Serializes the answer set as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
