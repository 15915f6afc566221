use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REQUIRED_MESSAGE: &str = "This field is required.";
pub const DEFAULT_MAX_REF_DEPTH: usize = 32;
pub const DEFAULT_MAX_REF_EVALUATIONS: usize = 4096;

/// Engine tunables. Every field has a default so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    #[serde(default = "default_required_message")]
    pub required_message: String,
    /// Nesting limit for `ref` resolution; deeper chains evaluate to undefined.
    #[serde(default = "default_max_ref_depth")]
    pub max_ref_depth: usize,
    /// Fresh `ref` resolutions allowed per evaluation before the rest evaluate to undefined.
    #[serde(default = "default_max_ref_evaluations")]
    pub max_ref_evaluations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            required_message: default_required_message(),
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
            max_ref_evaluations: DEFAULT_MAX_REF_EVALUATIONS,
        }
    }
}

fn default_required_message() -> String {
    DEFAULT_REQUIRED_MESSAGE.to_string()
}

fn default_max_ref_depth() -> usize {
    DEFAULT_MAX_REF_DEPTH
}

fn default_max_ref_evaluations() -> usize {
    DEFAULT_MAX_REF_EVALUATIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").expect("config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.required_message, "This field is required.");
    }

    #[test]
    fn partial_config_overrides_one_field() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "max_ref_depth": 4 }"#).expect("config");
        assert_eq!(config.max_ref_depth, 4);
        assert_eq!(config.max_ref_evaluations, DEFAULT_MAX_REF_EVALUATIONS);
        assert_eq!(config.required_message, DEFAULT_REQUIRED_MESSAGE);
    }
}
