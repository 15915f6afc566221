pub mod effect;
pub mod element;
pub mod form;

use serde_json::Value;

pub use effect::{Effect, EffectKind, ValidationRule};
pub use element::{
    BooleanChoice, ChoiceInput, ChoiceOption, DateTimeInput, DateTimeMode, FormSchemaElement,
    InputElement, NumberInput, StaticContent, TextInput,
};
pub use form::{FormSchema, FormSchemaPage, SchemaError, SchemaRefs};

/// JSON Schema describing a form schema document, for authoring tools.
pub fn schema_document_json_schema() -> Value {
    schemars::schema_for!(FormSchema).to_value()
}
