mod wizard;

use clap::{Parser, Subcommand};
use component_form::{get_schema_json_schema, navigate, set_value, snapshot, submit};
use form_spec::{
    AnswerSet, Answers, ChoiceOption, EngineConfig, EngineSnapshot, FormEngine, FormSchema,
    FormSchemaElement, check_schema, parse_answers, spec::element::option_answer_key,
};
use serde_json::{Number, Value, json};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "FORM_WIZARD_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Text-based dynamic form wizard",
    long_about = "Runs multi-page form schemas page by page and checks schemas and answers backed by the form component"
)]
struct Cli {
    /// Show verbose output (navigation state, parse expectations, debug logs).
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill in a form page by page in a text shell.
    Run {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file containing initial answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Optional JSON file with engine settings.
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },
    /// Report validation errors on every visible page.
    Validate {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Optional JSON file with engine settings.
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },
    /// Lint a schema for duplicate keys, broken refs and malformed choices.
    Check {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
    },
    /// Print the JSON Schema describing form schema documents.
    JsonSchema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Run {
            schema,
            answers,
            config,
        } => run_wizard(schema, answers, config, cli.verbose),
        Command::Validate {
            schema,
            answers,
            config,
        } => run_validate(schema, answers, config),
        Command::Check { schema } => run_check(schema),
        Command::JsonSchema => run_json_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_schema(path: &Path) -> CliResult<(String, FormSchema)> {
    let json = fs::read_to_string(path)?;
    let schema = FormSchema::from_json(&json)?;
    Ok((json, schema))
}

fn load_engine_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_answers(path: Option<&Path>) -> CliResult<Answers> {
    match path {
        Some(path) => Ok(parse_answers(&fs::read_to_string(path)?)?),
        None => Ok(Answers::new()),
    }
}

fn run_validate(
    schema_path: PathBuf,
    answers_path: PathBuf,
    config_path: Option<PathBuf>,
) -> CliResult<()> {
    let (_, schema) = load_schema(&schema_path)?;
    let answers = load_answers(Some(&answers_path))?;
    let config = load_engine_config(config_path.as_deref())?;

    let engine = FormEngine::with_config(schema, answers, 0, config);
    let pages = engine.validation_errors_for_visible_pages();
    println!(
        "Validation result: {}",
        if pages.is_empty() { "valid" } else { "invalid" }
    );
    for page in &pages {
        let title = engine
            .schema()
            .page(page.page_index)
            .and_then(|page| page.title.as_deref())
            .unwrap_or("Untitled page");
        println!("Page {} ({}):", page.page_index + 1, title);
        for error in &page.errors {
            println!("  {} - {}", error.element_id, error.message);
        }
    }

    if pages.is_empty() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_check(schema_path: PathBuf) -> CliResult<()> {
    let (_, schema) = load_schema(&schema_path)?;
    let issues = check_schema(&schema);
    if issues.is_empty() {
        println!("Schema check: no issues found");
        return Ok(());
    }

    println!("Schema check: {} issue(s)", issues.len());
    for issue in &issues {
        println!(
            "  {} [{}] {}",
            issue.location,
            issue.code.as_str(),
            issue.message
        );
    }
    Err("schema check failed".into())
}

fn run_json_schema() -> CliResult<()> {
    let schema = parse_component_result(&get_schema_json_schema())?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// What the user typed at an element prompt.
enum Reply {
    Back,
    Skip,
    Answer(Vec<(String, Value)>),
}

/// Drives the form component one element at a time, carrying the session
/// JSON between calls the way a stateless host would.
struct WizardSession {
    form_id: String,
    config_json: String,
    session: Value,
}

impl WizardSession {
    fn snapshot(&self) -> CliResult<EngineSnapshot> {
        let value = parse_component_result(&snapshot(
            &self.form_id,
            &self.config_json,
            &self.session.to_string(),
        ))?;
        Ok(serde_json::from_value(value)?)
    }

    fn set_value(&mut self, key: &str, value: &Value) -> CliResult<()> {
        let response = parse_component_result(&set_value(
            &self.form_id,
            &self.config_json,
            &self.session.to_string(),
            key,
            &value.to_string(),
        ))?;
        self.session = response["session"].clone();
        Ok(())
    }

    /// Applies a navigation action and returns whether the page changed
    /// together with the resulting snapshot.
    fn navigate(&mut self, action: &str) -> CliResult<(bool, EngineSnapshot)> {
        let response = parse_component_result(&navigate(
            &self.form_id,
            &self.config_json,
            &self.session.to_string(),
            action,
        ))?;
        self.session = response["session"].clone();
        let moved = response["moved"] == true;
        debug!(action, moved, "wizard navigation");
        Ok((moved, serde_json::from_value(response["snapshot"].clone())?))
    }

    fn submit(&mut self) -> CliResult<Result<AnswerSet, EngineSnapshot>> {
        let response = parse_component_result(&submit(
            &self.form_id,
            &self.config_json,
            &self.session.to_string(),
        ))?;
        self.session = response["session"].clone();
        if response["status"] == "submitted" {
            Ok(Ok(serde_json::from_value(response["answers"].clone())?))
        } else {
            Ok(Err(serde_json::from_value(response["snapshot"].clone())?))
        }
    }
}

fn run_wizard(
    schema_path: PathBuf,
    answers_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> CliResult<()> {
    let (schema_json, schema) = load_schema(&schema_path)?;
    let engine_config = load_engine_config(config_path.as_deref())?;
    let answers = load_answers(answers_path.as_deref())?;
    let form_id = schema.id.clone().unwrap_or_else(|| "form".to_string());

    let mut wizard = WizardSession {
        form_id: form_id.clone(),
        config_json: json!({ "form_schema_json": schema_json, "engine": engine_config })
            .to_string(),
        session: json!({ "answers": answers, "page": 0 }),
    };
    let presenter = WizardPresenter::new(Verbosity::from_verbose(verbose));
    presenter.show_header(schema.title.as_deref().unwrap_or(&form_id));

    'pages: loop {
        let mut view = wizard.snapshot()?;
        let page = schema
            .page(view.page)
            .ok_or_else(|| format!("page {} does not exist", view.page + 1))?;
        presenter.show_page(&view);

        for (element_index, element) in page.elements.iter().enumerate() {
            if view
                .current_page_hidden_elements
                .get(element_index)
                .copied()
                .unwrap_or(false)
            {
                continue;
            }
            if let FormSchemaElement::Heading(content) | FormSchemaElement::Text(content) = element
            {
                presenter.show_text(&content.text);
                continue;
            }

            let key = element.answer_key(view.page, element_index);
            let prompt = PromptContext::new(element, &key, view.answers.get(&key));
            match prompt_element(&prompt, element, &key, &presenter)? {
                Reply::Back => {
                    let (moved, _) = wizard.navigate("backward")?;
                    if !moved {
                        presenter.show_notice("Already on the first visible page.");
                    }
                    continue 'pages;
                }
                Reply::Skip => {}
                Reply::Answer(updates) => {
                    for (key, value) in &updates {
                        wizard.set_value(key, value)?;
                    }
                    view = wizard.snapshot()?;
                }
            }
        }

        if view.can_submit {
            match wizard.submit()? {
                Ok(answer_set) => {
                    presenter.show_completion(&answer_set);
                    return Ok(());
                }
                Err(blocked) => {
                    presenter.show_validation_errors(&blocked.current_page_validation_errors)
                }
            }
        } else {
            let (moved, after) = wizard.navigate("forward")?;
            if !moved {
                presenter.show_validation_errors(&after.current_page_validation_errors);
            }
        }
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn prompt_element(
    prompt: &PromptContext,
    element: &FormSchemaElement,
    key: &str,
    presenter: &WizardPresenter,
) -> CliResult<Reply> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input ended before the form was submitted".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }
        if trimmed.eq_ignore_ascii_case("back") {
            return Ok(Reply::Back);
        }
        if trimmed.is_empty() {
            return Ok(Reply::Skip);
        }

        match parse_answer(element, key, trimmed) {
            Ok(updates) => return Ok(Reply::Answer(updates)),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Converts raw input into the answer entries the element writes.
fn parse_answer(
    element: &FormSchemaElement,
    key: &str,
    raw: &str,
) -> Result<Vec<(String, Value)>, AnswerParseError> {
    let single = |value: Value| vec![(key.to_string(), value)];
    match element {
        FormSchemaElement::NumberInput(_) => parse_number(raw).map(single),
        FormSchemaElement::BooleanChoice(_) | FormSchemaElement::Checkbox(_) => {
            parse_boolean(raw).map(single)
        }
        FormSchemaElement::SingleChoice(choice) | FormSchemaElement::SingleChoiceSelect(choice) => {
            parse_choice(&choice.options, raw)
                .map(|option| single(Value::String(option.value.clone())))
        }
        FormSchemaElement::MultiChoice(choice) => parse_multi_choice(key, &choice.options, raw),
        _ => Ok(single(Value::String(raw.to_string()))),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(Number::from(integer)));
    }
    raw.parse::<f64>()
        .map_err(|_| {
            AnswerParseError::new(
                "Please enter a number.",
                Some("expected number".to_string()),
            )
        })
        .and_then(|value| {
            Number::from_f64(value).map(Value::Number).ok_or_else(|| {
                AnswerParseError::new(
                    "Please enter a finite number.",
                    Some("number must be finite".to_string()),
                )
            })
        })
}

/// Matches a 1-based position, an option value or an option label.
fn parse_choice<'a>(
    options: &'a [ChoiceOption],
    raw: &str,
) -> Result<&'a ChoiceOption, AnswerParseError> {
    let raw = raw.trim();
    if let Ok(position) = raw.parse::<usize>()
        && let Some(option) = position.checked_sub(1).and_then(|index| options.get(index))
    {
        return Ok(option);
    }
    options
        .iter()
        .find(|option| {
            option.value.eq_ignore_ascii_case(raw) || option.display().eq_ignore_ascii_case(raw)
        })
        .ok_or_else(|| {
            let allowed = options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            AnswerParseError::new(
                format!("Choose one of: {}.", allowed),
                Some(format!("allowed values: {}", allowed)),
            )
        })
}

/// Writes the selected values under `key` and one boolean flag per option.
fn parse_multi_choice(
    key: &str,
    options: &[ChoiceOption],
    raw: &str,
) -> Result<Vec<(String, Value)>, AnswerParseError> {
    let mut chosen = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        chosen.push(parse_choice(options, part)?.value.as_str());
    }

    let selected: Vec<Value> = options
        .iter()
        .filter(|option| chosen.contains(&option.value.as_str()))
        .map(|option| Value::String(option.value.clone()))
        .collect();
    let mut updates = vec![(key.to_string(), Value::Array(selected))];
    updates.extend(options.iter().map(|option| {
        (
            option_answer_key(key, &option.value),
            Value::Bool(chosen.contains(&option.value.as_str())),
        )
    }));
    Ok(updates)
}
