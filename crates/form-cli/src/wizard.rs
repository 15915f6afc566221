use form_spec::{
    AnswerSet, EngineSnapshot, FormSchemaElement, ValidationError,
    spec::{DateTimeMode, NumberInput, TextInput},
};
use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: page titles and prompts only.
    Clean,
    /// Verbose output: navigation state, hidden elements and choice values.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints pages, prompts and results as the engine moves through a form.
pub struct WizardPresenter {
    verbosity: Verbosity,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn show_header(&self, title: &str) {
        println!("Form: {}", title);
        println!("Type 'back' to return to the previous page or 'exit' to quit.");
    }

    pub fn show_page(&self, snapshot: &EngineSnapshot) {
        let title = snapshot.current_page_title.as_deref().unwrap_or("Untitled page");
        println!();
        println!("== Page {}/{}: {} ==", snapshot.page + 1, snapshot.page_count, title);
        if self.verbosity.is_verbose() {
            println!(
                "Navigation: back={} forward={} submit={}",
                snapshot.can_go_backward, snapshot.can_go_forward, snapshot.can_submit
            );
            let hidden = snapshot
                .current_page_hidden_elements
                .iter()
                .filter(|hidden| **hidden)
                .count();
            if hidden > 0 {
                println!("Hidden elements on this page: {}", hidden);
            }
        }
    }

    pub fn show_text(&self, text: &str) {
        println!("{}", text);
    }

    pub fn show_notice(&self, notice: &str) {
        println!("{}", notice);
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.title.clone();
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [current: {}]", current));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if !prompt.choices.is_empty() {
            for (index, choice) in prompt.choices.iter().enumerate() {
                println!("  {}) {}", index + 1, choice);
            }
        }
        if self.verbosity.is_verbose()
            && let Some(helper) = &prompt.helper_text
        {
            println!("Help: {}", helper);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_validation_errors(&self, errors: &[ValidationError]) {
        println!("Please fix the following before continuing:");
        for error in errors {
            println!("  {} - {}", error.element_id, error.message);
        }
    }

    pub fn show_completion(&self, answer_set: &AnswerSet) {
        println!("Done ✅");
        match answer_set.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        match answer_set.to_json_pretty() {
            Ok(pretty) => println!("{}", pretty),
            Err(err) => {
                eprintln!("Failed to serialize answers to JSON: {}", err);
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub title: String,
    pub description: Option<String>,
    pub helper_text: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub choices: Vec<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(element: &FormSchemaElement, key: &str, current: Option<&Value>) -> Self {
        let input = element.input();
        Self {
            title: element.label().unwrap_or(key).to_string(),
            description: input.and_then(|input| input.description.clone()),
            helper_text: input.and_then(|input| input.helper_text.clone()),
            required: element.required(),
            hint: element_hint(element),
            choices: element
                .options()
                .iter()
                .map(|option| option.display().to_string())
                .collect(),
            current: current.filter(|value| !value.is_null()).map(display_value),
        }
    }
}

fn element_hint(element: &FormSchemaElement) -> Option<String> {
    match element {
        FormSchemaElement::TextInput(TextInput { placeholder, .. }) => {
            placeholder.as_ref().map(|placeholder| format!("({})", placeholder))
        }
        FormSchemaElement::NumberInput(NumberInput { min, max, .. }) => Some(match (min, max) {
            (Some(min), Some(max)) => format!("(number, {}-{})", min, max),
            (Some(min), None) => format!("(number, at least {})", min),
            (None, Some(max)) => format!("(number, at most {})", max),
            (None, None) => "(number)".to_string(),
        }),
        FormSchemaElement::BooleanChoice(choice) => Some(format!(
            "({}/{})",
            choice.true_label.as_deref().unwrap_or("yes"),
            choice.false_label.as_deref().unwrap_or("no")
        )),
        FormSchemaElement::Checkbox(_) => Some("(yes/no)".to_string()),
        FormSchemaElement::SingleChoice(_) | FormSchemaElement::SingleChoiceSelect(_) => {
            Some("(pick one by number or value)".to_string())
        }
        FormSchemaElement::MultiChoice(_) => {
            Some("(comma-separated numbers or values)".to_string())
        }
        FormSchemaElement::DateTime(input) => Some(
            match input.mode {
                DateTimeMode::Date => "(YYYY-MM-DD)",
                DateTimeMode::Time => "(HH:MM)",
                DateTimeMode::DateTime => "(YYYY-MM-DDTHH:MM)",
            }
            .to_string(),
        ),
        FormSchemaElement::Heading(_) | FormSchemaElement::Text(_) => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(value: Value) -> FormSchemaElement {
        serde_json::from_value(value).expect("element")
    }

    #[test]
    fn prompt_uses_label_and_falls_back_to_key() {
        let labelled = element(json!({
            "type": "text-input",
            "id": "name",
            "label": "Name",
            "required": true
        }));
        let prompt = PromptContext::new(&labelled, "name", Some(&json!("Ada")));
        assert_eq!(prompt.title, "Name");
        assert!(prompt.required);
        assert_eq!(prompt.current.as_deref(), Some("Ada"));

        let bare = element(json!({ "type": "checkbox" }));
        let prompt = PromptContext::new(&bare, "page-0-element-3", None);
        assert_eq!(prompt.title, "page-0-element-3");
        assert_eq!(prompt.hint.as_deref(), Some("(yes/no)"));
    }

    #[test]
    fn hints_describe_expected_input() {
        let number = element(json!({ "type": "number-input", "id": "cups", "min": 1, "max": 20 }));
        assert_eq!(element_hint(&number).as_deref(), Some("(number, 1-20)"));

        let date = element(json!({ "type": "date-time", "id": "day", "mode": "date" }));
        assert_eq!(element_hint(&date).as_deref(), Some("(YYYY-MM-DD)"));

        let choice = element(json!({
            "type": "multi-choice",
            "id": "extras",
            "options": [{ "value": "milk" }, { "value": "sugar", "label": "Sugar" }]
        }));
        let prompt = PromptContext::new(&choice, "extras", Some(&json!(["milk", "sugar"])));
        assert_eq!(prompt.choices, vec!["milk", "Sugar"]);
        assert_eq!(prompt.current.as_deref(), Some("milk, sugar"));
    }

    #[test]
    fn hex_encoding_is_lowercase_and_padded() {
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xa1]), "000fa1");
    }
}
