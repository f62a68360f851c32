use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};


/// Knobs of an [crate::EvaluationContext]. Every field has a default, so a
/// config file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Deepest nesting of closure calls before evaluation fails
    pub max_call_depth: usize,

    /// strftime-style format of the timestamp written by `log`
    pub log_time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: 10_000,
            log_time_format: "%H:%M:%S".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid log_time_format {0:?}")]
    TimeFormat(String),

    #[error("max_call_depth must be at least 1")]
    CallDepth,
}

impl Config {
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::CallDepth);
        }
        if StrftimeItems::new(&self.log_time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::TimeFormat(self.log_time_format.clone()));
        }
        Ok(())
    }
}
