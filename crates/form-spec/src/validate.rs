use serde_json::Value;

use crate::answers::ValidationError;
use crate::config::EngineConfig;
use crate::expr::EvalContext;
use crate::rules::is_hidden;
use crate::spec::{FormSchemaElement, FormSchemaPage};

/// Validation errors for one page, in element order.
///
/// Hidden elements are skipped entirely. A required element with an empty
/// answer yields one error, and every falsy validation rule yields another.
pub fn page_validation_errors(
    page: &FormSchemaPage,
    page_index: usize,
    ctx: &EvalContext<'_>,
    config: &EngineConfig,
) -> Vec<ValidationError> {
    page.elements
        .iter()
        .enumerate()
        .filter(|(_, element)| !is_hidden(*element, ctx))
        .flat_map(|(element_index, element)| {
            element_errors(element, element.answer_key(page_index, element_index), ctx, config)
        })
        .collect()
}

fn element_errors(
    element: &FormSchemaElement,
    key: String,
    ctx: &EvalContext<'_>,
    config: &EngineConfig,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if element.required() && is_effectively_empty(ctx.answers.get(&key)) {
        errors.push(ValidationError::new(&key, &config.required_message));
    }

    errors.extend(
        element
            .validation_rules()
            .iter()
            .filter(|rule| !rule.condition.is_truthy(ctx))
            .map(|rule| ValidationError::new(&key, &rule.message)),
    );

    errors
}

/// Missing, `null`, or a whitespace-only string.
pub fn is_effectively_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::answers::{Answers, answers_or_empty};
    use crate::expr::Expression;
    use crate::spec::{Effect, InputElement, TextInput, ValidationRule};

    fn text_input(id: Option<&str>, required: bool) -> InputElement {
        InputElement {
            id: id.map(str::to_string),
            required,
            ..Default::default()
        }
    }

    fn page(inputs: Vec<InputElement>) -> FormSchemaPage {
        FormSchemaPage::new(
            inputs
                .into_iter()
                .map(|input| {
                    FormSchemaElement::TextInput(TextInput {
                        input,
                        ..Default::default()
                    })
                })
                .collect(),
        )
    }

    fn errors(page: &FormSchemaPage, answers: &Answers) -> Vec<ValidationError> {
        let conditions = BTreeMap::new();
        page_validation_errors(
            page,
            0,
            &EvalContext::new(answers, &conditions),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn required_field_reports_empty_values() {
        let page = page(vec![text_input(Some("name"), true)]);
        for empty in [json!({}), json!({ "name": null }), json!({ "name": "   " })] {
            let found = errors(&page, &answers_or_empty(&empty));
            assert_eq!(
                found,
                vec![ValidationError::new("name", "This field is required.")]
            );
        }
        assert!(errors(&page, &answers_or_empty(&json!({ "name": "Ada" }))).is_empty());
        assert!(errors(&page, &answers_or_empty(&json!({ "name": 0 }))).is_empty());
        assert!(errors(&page, &answers_or_empty(&json!({ "name": false }))).is_empty());
    }

    #[test]
    fn missing_id_falls_back_to_positional_key() {
        let page = page(vec![text_input(Some("a"), false), text_input(None, true)]);
        let found = errors(&page, &Answers::new());
        assert_eq!(found[0].element_id, "page-0-element-1");
        let filled = answers_or_empty(&json!({ "page-0-element-1": "x" }));
        assert!(errors(&page, &filled).is_empty());
    }

    #[test]
    fn hidden_elements_never_produce_errors() {
        let mut input = text_input(Some("secret"), true);
        input.effects = vec![Effect::hide_unless(Expression::value("reveal"))];
        input.validation_rules = vec![ValidationRule::new("never", false)];
        let page = page(vec![input]);

        assert!(errors(&page, &answers_or_empty(&json!({ "reveal": false }))).is_empty());
        assert_eq!(
            errors(&page, &answers_or_empty(&json!({ "reveal": true }))).len(),
            2
        );
    }

    #[test]
    fn each_failing_rule_is_reported_in_order() {
        let mut age = text_input(Some("age"), true);
        age.validation_rules = vec![
            ValidationRule::new("too young", Expression::ge(Expression::value("age"), 18)),
            ValidationRule::new("too old", Expression::le(Expression::value("age"), 120)),
            ValidationRule::new("must be even", Expression::eq(Expression::value("even"), true)),
        ];
        let page = page(vec![age, text_input(Some("other"), true)]);
        let found = errors(&page, &answers_or_empty(&json!({ "age": "12" })));
        let messages: Vec<_> = found.iter().map(|error| error.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["too young", "must be even", "This field is required."]
        );
        assert_eq!(found[2].element_id, "other");
    }

    #[test]
    fn required_message_is_configurable() {
        let page = page(vec![text_input(Some("name"), true)]);
        let conditions = BTreeMap::new();
        let answers = Answers::new();
        let config = EngineConfig {
            required_message: "Verplicht veld.".into(),
            ..Default::default()
        };
        let found = page_validation_errors(
            &page,
            0,
            &EvalContext::new(&answers, &conditions),
            &config,
        );
        assert_eq!(found[0].message, "Verplicht veld.");
    }
}
