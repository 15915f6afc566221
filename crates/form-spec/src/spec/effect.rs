use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Expression;

/// Effect name. Only `hide` has behavior; other names are kept verbatim and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EffectKind {
    Hide,
    Show,
    Other(String),
}

impl EffectKind {
    pub fn as_str(&self) -> &str {
        match self {
            EffectKind::Hide => "hide",
            EffectKind::Show => "show",
            EffectKind::Other(name) => name,
        }
    }
}

impl From<String> for EffectKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "hide" => EffectKind::Hide,
            "show" => EffectKind::Show,
            _ => EffectKind::Other(name),
        }
    }
}

impl From<EffectKind> for String {
    fn from(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Conditional instruction attached to a page or element.
///
/// For `hide`, `condition` describes when the target is shown: the effect
/// applies while the condition is falsy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Effect {
    #[schemars(with = "String")]
    pub effect: EffectKind,
    pub condition: Expression,
}

impl Effect {
    pub fn hide_unless(condition: impl Into<Expression>) -> Self {
        Self {
            effect: EffectKind::Hide,
            condition: condition.into(),
        }
    }
}

/// Custom check on an element; fails while `condition` is falsy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationRule {
    pub message: String,
    pub condition: Expression,
}

impl ValidationRule {
    pub fn new(message: impl Into<String>, condition: impl Into<Expression>) -> Self {
        Self {
            message: message.into(),
            condition: condition.into(),
        }
    }
}
