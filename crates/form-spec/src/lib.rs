#![allow(missing_docs)]

pub mod answers;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod expr;
pub mod lint;
pub mod mutate;
pub mod rules;
pub mod spec;
pub mod validate;

pub use answers::{AnswerSet, Answers, ValidationError, answers_or_empty, parse_answers};
pub use coerce::Evaluated;
pub use config::EngineConfig;
pub use engine::{DerivedState, EngineSession, EngineSnapshot, FormEngine, PageErrors};
pub use expr::{BinaryOp, EvalContext, Expression, Literal, Node, evaluate, is_truthy};
pub use lint::{IssueCode, SchemaIssue, check_schema};
pub use mutate::{
    Direction, insert_element, insert_page, move_element, move_page, remove_element, remove_page,
    safe_swap, update_element, update_elements, update_page, update_pages,
};
pub use rules::{HasEffects, RuleOutcome, evaluate_rules, is_hidden};
pub use spec::{
    ChoiceOption, Effect, EffectKind, FormSchema, FormSchemaElement, FormSchemaPage,
    InputElement, SchemaError, SchemaRefs, ValidationRule, schema_document_json_schema,
};
pub use validate::{is_effectively_empty, page_validation_errors};
