use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::effect::{Effect, ValidationRule};

/// One renderable unit on a page, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FormSchemaElement {
    Heading(StaticContent),
    Text(StaticContent),
    TextInput(TextInput),
    NumberInput(NumberInput),
    BooleanChoice(BooleanChoice),
    Checkbox(InputElement),
    SingleChoice(ChoiceInput),
    SingleChoiceSelect(ChoiceInput),
    MultiChoice(ChoiceInput),
    DateTime(DateTimeInput),
}

/// Display-only content for headings and text blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StaticContent {
    #[serde(default)]
    pub text: String,
}

/// Fields shared by every element that collects an answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InputElement {
    /// Answer key; unique across the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextInput {
    #[serde(flatten)]
    pub input: InputElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub multiline: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NumberInput {
    #[serde(flatten)]
    pub input: InputElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BooleanChoice {
    #[serde(flatten)]
    pub input: InputElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_label: Option<String>,
}

/// Shared shape of single-choice, select and multi-choice elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceInput {
    #[serde(flatten)]
    pub input: InputElement,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    pub fn display(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DateTimeMode {
    Date,
    Time,
    #[default]
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeInput {
    #[serde(flatten)]
    pub input: InputElement,
    #[serde(default)]
    pub mode: DateTimeMode,
}

impl FormSchemaElement {
    /// The `type` tag used in schema documents.
    pub fn kind(&self) -> &'static str {
        match self {
            FormSchemaElement::Heading(_) => "heading",
            FormSchemaElement::Text(_) => "text",
            FormSchemaElement::TextInput(_) => "text-input",
            FormSchemaElement::NumberInput(_) => "number-input",
            FormSchemaElement::BooleanChoice(_) => "boolean-choice",
            FormSchemaElement::Checkbox(_) => "checkbox",
            FormSchemaElement::SingleChoice(_) => "single-choice",
            FormSchemaElement::SingleChoiceSelect(_) => "single-choice-select",
            FormSchemaElement::MultiChoice(_) => "multi-choice",
            FormSchemaElement::DateTime(_) => "date-time",
        }
    }

    /// Input fields, or `None` for static content.
    pub fn input(&self) -> Option<&InputElement> {
        match self {
            FormSchemaElement::Heading(_) | FormSchemaElement::Text(_) => None,
            FormSchemaElement::TextInput(element) => Some(&element.input),
            FormSchemaElement::NumberInput(element) => Some(&element.input),
            FormSchemaElement::BooleanChoice(element) => Some(&element.input),
            FormSchemaElement::Checkbox(input) => Some(input),
            FormSchemaElement::SingleChoice(element)
            | FormSchemaElement::SingleChoiceSelect(element)
            | FormSchemaElement::MultiChoice(element) => Some(&element.input),
            FormSchemaElement::DateTime(element) => Some(&element.input),
        }
    }

    pub fn input_mut(&mut self) -> Option<&mut InputElement> {
        match self {
            FormSchemaElement::Heading(_) | FormSchemaElement::Text(_) => None,
            FormSchemaElement::TextInput(element) => Some(&mut element.input),
            FormSchemaElement::NumberInput(element) => Some(&mut element.input),
            FormSchemaElement::BooleanChoice(element) => Some(&mut element.input),
            FormSchemaElement::Checkbox(input) => Some(input),
            FormSchemaElement::SingleChoice(element)
            | FormSchemaElement::SingleChoiceSelect(element)
            | FormSchemaElement::MultiChoice(element) => Some(&mut element.input),
            FormSchemaElement::DateTime(element) => Some(&mut element.input),
        }
    }

    pub fn is_static(&self) -> bool {
        self.input().is_none()
    }

    pub fn id(&self) -> Option<&str> {
        self.input().and_then(|input| input.id.as_deref())
    }

    pub fn required(&self) -> bool {
        self.input().is_some_and(|input| input.required)
    }

    pub fn label(&self) -> Option<&str> {
        self.input().and_then(|input| input.label.as_deref())
    }

    pub fn effects(&self) -> &[Effect] {
        self.input().map(|input| input.effects.as_slice()).unwrap_or(&[])
    }

    pub fn validation_rules(&self) -> &[ValidationRule] {
        self.input()
            .map(|input| input.validation_rules.as_slice())
            .unwrap_or(&[])
    }

    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            FormSchemaElement::SingleChoice(element)
            | FormSchemaElement::SingleChoiceSelect(element)
            | FormSchemaElement::MultiChoice(element) => &element.options,
            _ => &[],
        }
    }

    /// Answer key for the element at `pages[page_index].elements[element_index]`:
    /// its id, or a positional fallback when the id is missing.
    pub fn answer_key(&self, page_index: usize, element_index: usize) -> String {
        match self.id() {
            Some(id) => id.to_string(),
            None => fallback_answer_key(page_index, element_index),
        }
    }

    /// Every key this element writes: its id plus `id.option` per multi-choice option.
    pub fn answer_keys(&self) -> Vec<String> {
        let Some(id) = self.id() else {
            return Vec::new();
        };
        let mut keys = vec![id.to_string()];
        if let FormSchemaElement::MultiChoice(element) = self {
            keys.extend(
                element
                    .options
                    .iter()
                    .map(|option| option_answer_key(id, &option.value)),
            );
        }
        keys
    }
}

pub fn fallback_answer_key(page_index: usize, element_index: usize) -> String {
    format!("page-{page_index}-element-{element_index}")
}

/// Derived boolean flag key for one multi-choice option.
pub fn option_answer_key(id: &str, option: &str) -> String {
    format!("{id}.{option}")
}
