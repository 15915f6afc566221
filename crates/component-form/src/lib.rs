use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use form_spec::{
    EngineConfig, EngineSession, FormEngine, FormSchema, SchemaError, check_schema,
    schema_document_json_schema,
};

const DEFAULT_SCHEMA: &str = include_str!("../../form-spec/tests/fixtures/coffee_survey.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("failed to parse value: {0}")]
    ValueParse(#[source] serde_json::Error),
    #[error("unknown navigation action '{0}'")]
    UnknownAction(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_schema_json: Option<String>,
    #[serde(default)]
    engine: EngineConfig,
}

fn load_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        return Ok(ComponentConfig::default());
    }
    serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
}

/// Loads the configured schema and checks it answers to `form_id`.
/// A schema without an id answers to any form id.
fn ensure_form(
    form_id: &str,
    config_json: &str,
) -> Result<(FormSchema, EngineConfig), ComponentError> {
    let config = load_config(config_json)?;
    let schema_json = config.form_schema_json.as_deref().unwrap_or(DEFAULT_SCHEMA);
    let schema = FormSchema::from_json(schema_json)?;
    match schema.id.as_deref() {
        Some(id) if id != form_id => Err(ComponentError::FormUnavailable(form_id.to_string())),
        _ => Ok((schema, config.engine)),
    }
}

fn parse_session(session_json: &str) -> EngineSession {
    if session_json.trim().is_empty() {
        return EngineSession::default();
    }
    serde_json::from_str(session_json).unwrap_or_else(|error| {
        warn!(%error, "ignoring unreadable session, starting a new one");
        EngineSession::default()
    })
}

fn load_engine(
    form_id: &str,
    config_json: &str,
    session_json: &str,
) -> Result<FormEngine, ComponentError> {
    let (schema, config) = ensure_form(form_id, config_json)?;
    Ok(FormEngine::restore(
        schema,
        parse_session(session_json),
        config,
    ))
}

fn to_json(value: impl Serialize) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

fn state_response(engine: &FormEngine) -> Result<Value, ComponentError> {
    Ok(json!({
        "session": to_json(engine.session())?,
        "snapshot": to_json(engine.snapshot())?,
    }))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|(schema, _)| to_json(schema)))
}

pub fn get_schema_json_schema() -> String {
    respond(Ok(schema_document_json_schema()))
}

pub fn check(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|(schema, _)| {
        let issues = check_schema(&schema);
        Ok(json!({
            "valid": issues.is_empty(),
            "issues": to_json(issues)?,
        }))
    }))
}

pub fn validate_page(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        load_engine(form_id, config_json, session_json).and_then(|engine| {
            let errors = engine.current_page_validation_errors();
            Ok(json!({
                "page": engine.page(),
                "valid": errors.is_empty(),
                "errors": to_json(errors)?,
            }))
        }),
    )
}

pub fn snapshot(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        load_engine(form_id, config_json, session_json)
            .and_then(|engine| to_json(engine.snapshot())),
    )
}

pub fn set_value(
    form_id: &str,
    config_json: &str,
    session_json: &str,
    element_id: &str,
    value_json: &str,
) -> String {
    respond(
        load_engine(form_id, config_json, session_json).and_then(|mut engine| {
            let value: Value =
                serde_json::from_str(value_json).map_err(ComponentError::ValueParse)?;
            engine.set_value(element_id, value);
            state_response(&engine)
        }),
    )
}

enum Action {
    Forward,
    Backward,
    Submit,
    Page(usize),
}

impl Action {
    fn parse(raw: &str) -> Result<Self, ComponentError> {
        let raw = raw.trim();
        match raw {
            "forward" => Ok(Action::Forward),
            "backward" => Ok(Action::Backward),
            "submit" => Ok(Action::Submit),
            _ => raw
                .strip_prefix("page:")
                .and_then(|index| index.trim().parse().ok())
                .map(Action::Page)
                .ok_or_else(|| ComponentError::UnknownAction(raw.to_string())),
        }
    }
}

pub fn navigate(form_id: &str, config_json: &str, session_json: &str, action: &str) -> String {
    respond(
        load_engine(form_id, config_json, session_json).and_then(|mut engine| {
            let moved = match Action::parse(action)? {
                Action::Forward => engine.go_forward(),
                Action::Backward => engine.go_backward(),
                Action::Submit => engine.submit(),
                Action::Page(page) => {
                    engine.set_page(page);
                    true
                }
            };
            let mut response = state_response(&engine)?;
            response["moved"] = Value::Bool(moved);
            Ok(response)
        }),
    )
}

pub fn submit(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        load_engine(form_id, config_json, session_json).and_then(|mut engine| {
            let status = if !engine.can_submit() {
                "not_last_page"
            } else if engine.submit() {
                "submitted"
            } else {
                "invalid"
            };
            let mut response = state_response(&engine)?;
            response["status"] = json!(status);
            if status == "submitted" {
                response["answers"] = to_json(engine.answer_set())?;
            } else {
                response["errors"] = to_json(engine.validation_errors_for_visible_pages())?;
            }
            Ok(response)
        }),
    )
}
