//! Page navigation state machine.
//!
//! A [`FormEngine`] owns the schema, the answers and the current page index.
//! Every setter applies its change and then recomputes all derived fields in
//! one go, so readers never observe a stale mix of old and new state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::answers::{AnswerSet, Answers, ValidationError};
use crate::config::EngineConfig;
use crate::expr::EvalContext;
use crate::rules::is_hidden;
use crate::spec::element::option_answer_key;
use crate::spec::{FormSchema, FormSchemaPage};
use crate::validate::page_validation_errors;

/// Fields derived from `(schema, answers, page)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub hidden_pages: Vec<bool>,
    /// Closest visible page before the current one.
    pub previous_page_index: Option<usize>,
    /// Closest visible page after the current one.
    pub next_page_index: Option<usize>,
    /// No visible page remains after the current one.
    pub is_last_page: bool,
    pub current_page_hidden_elements: Vec<bool>,
    pub current_page_validation_errors: Vec<ValidationError>,
}

impl DerivedState {
    fn compute(
        schema: &FormSchema,
        answers: &Answers,
        page: usize,
        config: &EngineConfig,
    ) -> Self {
        let ctx = EvalContext::for_schema(schema, answers, config);
        let hidden_pages: Vec<bool> = schema
            .pages
            .iter()
            .map(|candidate| is_hidden(candidate, &ctx))
            .collect();

        let previous_page_index = (0..page.min(hidden_pages.len()))
            .rev()
            .find(|index| !hidden_pages[*index]);
        let next_page_index = (page.saturating_add(1)..hidden_pages.len())
            .find(|index| !hidden_pages[*index]);
        let is_last_page = next_page_index.is_none();

        let (current_page_hidden_elements, current_page_validation_errors) =
            match schema.page(page) {
                Some(current) => (
                    current
                        .elements
                        .iter()
                        .map(|element| is_hidden(element, &ctx))
                        .collect(),
                    page_validation_errors(current, page, &ctx, config),
                ),
                None => (Vec::new(), Vec::new()),
            };

        Self {
            hidden_pages,
            previous_page_index,
            next_page_index,
            is_last_page,
            current_page_hidden_elements,
            current_page_validation_errors,
        }
    }
}

/// Resumable part of an engine: everything except the schema and config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSession {
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub show_validation_errors: bool,
}

/// One consistent view of the engine for UI collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub page: usize,
    pub page_count: usize,
    pub current_page_title: Option<String>,
    pub previous_page_index: Option<usize>,
    pub next_page_index: Option<usize>,
    pub can_go_backward: bool,
    pub can_go_forward: bool,
    pub can_submit: bool,
    pub hidden_pages: Vec<bool>,
    pub current_page_hidden_elements: Vec<bool>,
    pub current_page_validation_errors: Vec<ValidationError>,
    pub show_validation_errors: bool,
    pub answers: Answers,
}

/// Validation errors of one visible page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageErrors {
    pub page_index: usize,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone)]
pub struct FormEngine {
    schema: FormSchema,
    answers: Answers,
    page: usize,
    show_validation_errors: bool,
    config: EngineConfig,
    derived: DerivedState,
}

impl Default for FormEngine {
    fn default() -> Self {
        Self::new(FormSchema::default(), Answers::new(), 0)
    }
}

impl FormEngine {
    pub fn new(schema: FormSchema, answers: Answers, page: usize) -> Self {
        Self::with_config(schema, answers, page, EngineConfig::default())
    }

    pub fn with_config(
        schema: FormSchema,
        answers: Answers,
        page: usize,
        config: EngineConfig,
    ) -> Self {
        let mut engine = Self {
            schema,
            answers,
            page,
            show_validation_errors: false,
            config,
            derived: DerivedState::default(),
        };
        engine.recompute();
        engine
    }

    /// Resume a persisted session against `schema`.
    pub fn restore(schema: FormSchema, session: EngineSession, config: EngineConfig) -> Self {
        let mut engine = Self::with_config(schema, session.answers, session.page, config);
        engine.show_validation_errors = session.show_validation_errors;
        engine
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn derived(&self) -> &DerivedState {
        &self.derived
    }

    /// `None` when the page index is past the end of the schema.
    pub fn current_page(&self) -> Option<&FormSchemaPage> {
        self.schema.page(self.page)
    }

    pub fn previous_page_index(&self) -> Option<usize> {
        self.derived.previous_page_index
    }

    pub fn next_page_index(&self) -> Option<usize> {
        self.derived.next_page_index
    }

    pub fn can_go_backward(&self) -> bool {
        self.derived.previous_page_index.is_some()
    }

    pub fn can_go_forward(&self) -> bool {
        self.derived.next_page_index.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.derived.is_last_page
    }

    pub fn hidden_pages(&self) -> &[bool] {
        &self.derived.hidden_pages
    }

    pub fn visible_pages(&self) -> Vec<usize> {
        self.derived
            .hidden_pages
            .iter()
            .enumerate()
            .filter(|(_, hidden)| !**hidden)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_element_hidden(&self, element_index: usize) -> bool {
        self.derived
            .current_page_hidden_elements
            .get(element_index)
            .copied()
            .unwrap_or(false)
    }

    pub fn current_page_validation_errors(&self) -> &[ValidationError] {
        &self.derived.current_page_validation_errors
    }

    pub fn show_validation_errors(&self) -> bool {
        self.show_validation_errors
    }

    /// Replaces the schema. The page index is not clamped here.
    pub fn set_schema(&mut self, schema: FormSchema) -> &DerivedState {
        self.schema = schema;
        self.recompute();
        &self.derived
    }

    pub fn set_state(&mut self, answers: Answers) -> &DerivedState {
        self.answers = answers;
        self.recompute();
        &self.derived
    }

    pub fn set_value(&mut self, id: impl Into<String>, value: Value) -> &DerivedState {
        let mut answers = self.answers.clone();
        answers.insert(id.into(), value);
        self.set_state(answers)
    }

    /// Selects or clears one multi-choice option: updates the array stored
    /// under `id` and the derived `id.option` flag together.
    pub fn set_option(&mut self, id: &str, option: &str, selected: bool) -> &DerivedState {
        let mut values = match self.answers.get(id) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        values.retain(|item| item.as_str() != Some(option));
        if selected {
            values.push(Value::String(option.to_string()));
        }

        let mut answers = self.answers.clone();
        answers.insert(id.to_string(), Value::Array(values));
        answers.insert(option_answer_key(id, option), Value::Bool(selected));
        self.set_state(answers)
    }

    /// Moves to `page`, clamped to the schema, and hides validation errors
    /// until the user tries to leave the new page.
    pub fn set_page(&mut self, page: usize) -> &DerivedState {
        self.page = page.min(self.schema.pages.len().saturating_sub(1));
        self.show_validation_errors = false;
        self.recompute();
        &self.derived
    }

    /// Advances to the next visible page. Blocked, with errors revealed, when
    /// the current page does not validate.
    pub fn go_forward(&mut self) -> bool {
        if self.reveal_errors_if_invalid() {
            return false;
        }
        match self.derived.next_page_index {
            Some(next) => {
                self.set_page(next);
                true
            }
            None => false,
        }
    }

    /// Returns to the previous visible page. Never blocked by validation.
    pub fn go_backward(&mut self) -> bool {
        match self.derived.previous_page_index {
            Some(previous) => {
                self.set_page(previous);
                true
            }
            None => false,
        }
    }

    /// `true` when the answers may be persisted: the current page is the last
    /// visible one and it validates.
    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        !self.reveal_errors_if_invalid()
    }

    pub fn session(&self) -> EngineSession {
        EngineSession {
            answers: self.answers.clone(),
            page: self.page,
            show_validation_errors: self.show_validation_errors,
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            page: self.page,
            page_count: self.schema.pages.len(),
            current_page_title: self.current_page().and_then(|page| page.title.clone()),
            previous_page_index: self.derived.previous_page_index,
            next_page_index: self.derived.next_page_index,
            can_go_backward: self.can_go_backward(),
            can_go_forward: self.can_go_forward(),
            can_submit: self.can_submit(),
            hidden_pages: self.derived.hidden_pages.clone(),
            current_page_hidden_elements: self.derived.current_page_hidden_elements.clone(),
            current_page_validation_errors: self.derived.current_page_validation_errors.clone(),
            show_validation_errors: self.show_validation_errors,
            answers: self.answers.clone(),
        }
    }

    pub fn answer_set(&self) -> AnswerSet {
        AnswerSet::new(self.schema.id.clone(), self.answers.clone())
    }

    /// Errors on every visible page, skipping pages that validate.
    pub fn validation_errors_for_visible_pages(&self) -> Vec<PageErrors> {
        let ctx = EvalContext::for_schema(&self.schema, &self.answers, &self.config);
        self.visible_pages()
            .into_iter()
            .filter_map(|page_index| {
                let page = self.schema.page(page_index)?;
                let errors = page_validation_errors(page, page_index, &ctx, &self.config);
                (!errors.is_empty()).then_some(PageErrors { page_index, errors })
            })
            .collect()
    }

    fn reveal_errors_if_invalid(&mut self) -> bool {
        let errors = self.derived.current_page_validation_errors.len();
        if errors == 0 {
            return false;
        }
        debug!(page = self.page, errors, "navigation blocked by validation errors");
        self.show_validation_errors = true;
        true
    }

    fn recompute(&mut self) {
        self.derived = DerivedState::compute(&self.schema, &self.answers, self.page, &self.config);
        debug!(
            page = self.page,
            pages = self.schema.pages.len(),
            hidden = self.derived.hidden_pages.iter().filter(|hidden| **hidden).count(),
            errors = self.derived.current_page_validation_errors.len(),
            "recomputed form engine state"
        );
    }
}
