//! Static checks for schema authors. Findings never stop a schema from
//! running; the engine degrades to falsy/no-op on every issue reported here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::expr::{Expression, Node};
use crate::spec::{Effect, FormSchema, FormSchemaElement, ValidationRule};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("identifier pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DuplicateKey,
    InvalidIdentifier,
    UnresolvedRef,
    CyclicRef,
    MissingOptions,
    DuplicateOption,
    UnrecognizedExpression,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::DuplicateKey => "duplicate_key",
            IssueCode::InvalidIdentifier => "invalid_identifier",
            IssueCode::UnresolvedRef => "unresolved_ref",
            IssueCode::CyclicRef => "cyclic_ref",
            IssueCode::MissingOptions => "missing_options",
            IssueCode::DuplicateOption => "duplicate_option",
            IssueCode::UnrecognizedExpression => "unrecognized_expression",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Where the issue was found, e.g. `pages[0].elements[2]`.
    pub location: String,
    pub code: IssueCode,
    pub message: String,
}

impl SchemaIssue {
    fn new(location: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            code,
            message: message.into(),
        }
    }
}

pub fn check_schema(schema: &FormSchema) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    check_answer_keys(schema, &mut issues);
    check_options(schema, &mut issues);
    check_expressions(schema, &mut issues);
    check_condition_cycles(schema, &mut issues);
    issues
}

fn element_location(page_index: usize, element_index: usize) -> String {
    format!("pages[{page_index}].elements[{element_index}]")
}

fn check_answer_keys(schema: &FormSchema, issues: &mut Vec<SchemaIssue>) {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (page_index, element_index, element) in schema.elements() {
        let location = element_location(page_index, element_index);
        if let Some(id) = element.id()
            && !IDENTIFIER.is_match(id)
        {
            issues.push(SchemaIssue::new(
                &location,
                IssueCode::InvalidIdentifier,
                format!("element id '{id}' must match {}", IDENTIFIER.as_str()),
            ));
        }
        for key in element.answer_keys() {
            if let Some(first) = seen.get(&key) {
                issues.push(SchemaIssue::new(
                    &location,
                    IssueCode::DuplicateKey,
                    format!("answer key '{key}' is already written by {first}"),
                ));
            } else {
                seen.insert(key, location.clone());
            }
        }
    }
}

fn check_options(schema: &FormSchema, issues: &mut Vec<SchemaIssue>) {
    for (page_index, element_index, element) in schema.elements() {
        let is_choice = matches!(
            element,
            FormSchemaElement::SingleChoice(_)
                | FormSchemaElement::SingleChoiceSelect(_)
                | FormSchemaElement::MultiChoice(_)
        );
        if !is_choice {
            continue;
        }
        let location = element_location(page_index, element_index);
        if element.options().is_empty() {
            issues.push(SchemaIssue::new(
                &location,
                IssueCode::MissingOptions,
                format!("{} element has no options", element.kind()),
            ));
        }
        let mut values = BTreeSet::new();
        for option in element.options() {
            if !values.insert(option.value.as_str()) {
                issues.push(SchemaIssue::new(
                    &location,
                    IssueCode::DuplicateOption,
                    format!("option value '{}' appears more than once", option.value),
                ));
            }
        }
    }
}

fn check_expressions(schema: &FormSchema, issues: &mut Vec<SchemaIssue>) {
    let mut check = |location: String, expression: &Expression| {
        expression.walk(&mut |node| match node {
            Expression::Unrecognized(raw) => issues.push(SchemaIssue::new(
                &location,
                IssueCode::UnrecognizedExpression,
                format!("expression {raw} is not understood and evaluates to false"),
            )),
            Expression::Node(Node::Ref { id }) if !schema.refs.conditions.contains_key(id) => {
                issues.push(SchemaIssue::new(
                    &location,
                    IssueCode::UnresolvedRef,
                    format!("condition '{id}' is not defined under refs.conditions"),
                ))
            }
            _ => {}
        });
    };

    for (page_index, page) in schema.pages.iter().enumerate() {
        for_effects(&page.effects, |effect_index, effect| {
            check(
                format!("pages[{page_index}].effects[{effect_index}]"),
                &effect.condition,
            )
        });
        for (element_index, element) in page.elements.iter().enumerate() {
            let location = element_location(page_index, element_index);
            for_effects(element.effects(), |effect_index, effect| {
                check(format!("{location}.effects[{effect_index}]"), &effect.condition)
            });
            for_rules(element.validation_rules(), |rule_index, rule| {
                check(
                    format!("{location}.validationRules[{rule_index}]"),
                    &rule.condition,
                )
            });
        }
    }
    for (name, condition) in &schema.refs.conditions {
        check(format!("refs.conditions.{name}"), condition);
    }
}

fn for_effects(effects: &[Effect], mut visit: impl FnMut(usize, &Effect)) {
    for (index, effect) in effects.iter().enumerate() {
        visit(index, effect);
    }
}

fn for_rules(rules: &[ValidationRule], mut visit: impl FnMut(usize, &ValidationRule)) {
    for (index, rule) in rules.iter().enumerate() {
        visit(index, rule);
    }
}

/// Reports each named condition that can reach itself through `ref`s.
fn check_condition_cycles(schema: &FormSchema, issues: &mut Vec<SchemaIssue>) {
    let edges: BTreeMap<&str, Vec<&str>> = schema
        .refs
        .conditions
        .iter()
        .map(|(name, condition)| (name.as_str(), condition.referenced_conditions()))
        .collect();

    for start in edges.keys() {
        let mut stack: Vec<&str> = edges.get(start).cloned().unwrap_or_default();
        let mut visited = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == *start {
                issues.push(SchemaIssue::new(
                    format!("refs.conditions.{start}"),
                    IssueCode::CyclicRef,
                    format!("condition '{start}' refers back to itself"),
                ));
                break;
            }
            if visited.insert(current)
                && let Some(next) = edges.get(current)
            {
                stack.extend(next.iter().copied());
            }
        }
    }
}
