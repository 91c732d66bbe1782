//! Strongly typed configuration schemas.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Settings for the LLM client's history bookkeeping and repair loop.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Repairs attempted after an invalid reply before giving up.
    pub max_repair_attempts: usize,
    /// Messages kept in the conversation history; `0` disables history.
    pub max_history_messages: usize,
    /// Memory path of the conversation history.
    pub history_variable: String,
    /// Memory path of the user's input.
    pub input_variable: String,
    /// Logs each repair attempt and its feedback at `info` level.
    pub log_repairs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_repair_attempts: 3,
            max_history_messages: 10,
            history_variable: "conversation.history".to_owned(),
            input_variable: "temp.input".to_owned(),
            log_repairs: false,
        }
    }
}

/// Limits applied when dispatching a plan.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum commands in one plan.
    pub max_steps: usize,
    /// Wall-clock budget for one plan in milliseconds.
    pub max_time_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            max_time_ms: 300_000,
        }
    }
}

impl ExecutionConfig {
    /// Returns the wall-clock budget.
    #[must_use]
    pub const fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }
}

/// Settings for the tracing subscriber.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives such as `info,turn_kernel=debug`.
    pub filter: String,
    /// Includes the event target in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            with_target: false,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding prompt folders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts_folder: Option<PathBuf>,
    /// LLM client settings.
    pub client: ClientConfig,
    /// Plan dispatch limits.
    pub execution: ExecutionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Parses JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when [`RuntimeConfig::validate`] fails.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML and
    /// [`ConfigError::Invalid`] when [`RuntimeConfig::validate`] fails.
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|err| ConfigError::parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty history or input variable,
    /// a zero step or time limit, or an empty log filter.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.client.history_variable.trim().is_empty() {
            return Err(ConfigError::invalid("client.history_variable cannot be empty"));
        }
        if self.client.input_variable.trim().is_empty() {
            return Err(ConfigError::invalid("client.input_variable cannot be empty"));
        }
        if self.execution.max_steps == 0 {
            return Err(ConfigError::invalid("execution.max_steps must be at least 1"));
        }
        if self.execution.max_time_ms == 0 {
            return Err(ConfigError::invalid("execution.max_time_ms must be at least 1"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{"client": {"max_repair_attempts": 1}}"#)
            .unwrap();
        assert_eq!(config.client.max_repair_attempts, 1);
        assert_eq!(config.client.max_history_messages, 10);
        assert_eq!(config.client.history_variable, "conversation.history");
        assert_eq!(config.execution, ExecutionConfig::default());
        assert_eq!(config.execution.max_time(), Duration::from_secs(300));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn parses_yaml() {
        let config = RuntimeConfig::from_yaml_str(
            "prompts_folder: prompts\nexecution:\n  max_steps: 5\nlogging:\n  filter: debug\n",
        )
        .unwrap();
        assert_eq!(config.prompts_folder, Some(PathBuf::from("prompts")));
        assert_eq!(config.execution.max_steps, 5);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn rejects_unusable_values() {
        let err = RuntimeConfig::from_json_str(r#"{"execution": {"max_steps": 0}}"#)
            .expect_err("zero steps");
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = RuntimeConfig::from_json_str("{not json").expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
