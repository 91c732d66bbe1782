//! Loading configuration from files and the environment.

use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::RuntimeConfig;

/// Overrides `logging.filter`.
pub const ENV_LOG: &str = "TURNKIT_LOG";
/// Overrides `client.max_repair_attempts`.
pub const ENV_MAX_REPAIR_ATTEMPTS: &str = "TURNKIT_MAX_REPAIR_ATTEMPTS";
/// Overrides `client.max_history_messages`.
pub const ENV_MAX_HISTORY_MESSAGES: &str = "TURNKIT_MAX_HISTORY_MESSAGES";
/// Overrides `execution.max_steps`.
pub const ENV_MAX_STEPS: &str = "TURNKIT_MAX_STEPS";

/// Loads configuration from `path`, choosing YAML for `.yaml`/`.yml` files and
/// JSON otherwise.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, and the errors of
/// [`RuntimeConfig::from_json_str`] or [`RuntimeConfig::from_yaml_str`].
pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<RuntimeConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    debug!(path = %path.display(), yaml = is_yaml, "loading runtime configuration");
    if is_yaml {
        RuntimeConfig::from_yaml_str(&text)
    } else {
        RuntimeConfig::from_json_str(&text)
    }
}

impl RuntimeConfig {
    /// Applies `TURNKIT_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] when a numeric variable does not
    /// parse, and [`ConfigError::Invalid`] when the result fails validation.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_with(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] when a numeric variable does not
    /// parse, and [`ConfigError::Invalid`] when the result fails validation.
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        if let Some(value) = lookup(ENV_MAX_REPAIR_ATTEMPTS) {
            self.client.max_repair_attempts = parse_override(ENV_MAX_REPAIR_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_HISTORY_MESSAGES) {
            self.client.max_history_messages = parse_override(ENV_MAX_HISTORY_MESSAGES, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_STEPS) {
            self.execution.max_steps = parse_override(ENV_MAX_STEPS, &value)?;
        }
        self.validate()
    }
}

fn parse_override<T>(name: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::InvalidOverride {
            name: name.to_owned(),
            value: value.to_owned(),
            reason: err.to_string(),
        })
}
