use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::Expression;
use crate::spec::effect::Effect;
use crate::spec::element::FormSchemaElement;

/// Failures at the document boundary. Evaluation itself never fails.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse form schema: {0}")]
    SchemaParse(#[source] serde_json::Error),
    #[error("failed to parse answers: {0}")]
    AnswersParse(#[source] serde_json::Error),
    #[error("answers must be a JSON object, got {0}")]
    AnswersNotObject(&'static str),
}

/// Schema-wide reusable definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchemaRefs {
    /// Named conditions resolved by `ref` expressions.
    #[serde(default)]
    pub conditions: BTreeMap<String, Expression>,
}

impl SchemaRefs {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormSchemaPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub elements: Vec<FormSchemaElement>,
    /// Effects on the whole page; a hidden page is skipped by navigation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl FormSchemaPage {
    pub fn new(elements: Vec<FormSchemaElement>) -> Self {
        Self {
            elements,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Top-level multi-page form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub pages: Vec<FormSchemaPage>,
    #[serde(default, skip_serializing_if = "SchemaRefs::is_empty")]
    pub refs: SchemaRefs,
}

/// An empty schema holding one empty page.
impl Default for FormSchema {
    fn default() -> Self {
        Self::new(vec![FormSchemaPage::default()])
    }
}

impl FormSchema {
    pub fn new(pages: Vec<FormSchemaPage>) -> Self {
        Self {
            id: None,
            title: None,
            pages,
            refs: SchemaRefs::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(json).map_err(SchemaError::SchemaParse)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn with_condition(mut self, name: impl Into<String>, condition: Expression) -> Self {
        self.refs.conditions.insert(name.into(), condition);
        self
    }

    pub fn page(&self, index: usize) -> Option<&FormSchemaPage> {
        self.pages.get(index)
    }

    /// Every element with its page and element index, in document order.
    pub fn elements(&self) -> impl Iterator<Item = (usize, usize, &FormSchemaElement)> {
        self.pages.iter().enumerate().flat_map(|(page_index, page)| {
            page.elements
                .iter()
                .enumerate()
                .map(move |(element_index, element)| (page_index, element_index, element))
        })
    }

    /// Finds the input element that owns answer key `id`.
    pub fn find_element(&self, id: &str) -> Option<&FormSchemaElement> {
        self.elements()
            .map(|(_, _, element)| element)
            .find(|element| element.id() == Some(id))
    }
}
