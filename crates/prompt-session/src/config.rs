//! Session configuration and its TOML form.

use std::path::{Path, PathBuf};
use std::time::Duration;

use prompt_screen::ClosePolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    /// The configuration is not valid TOML or has unknown keys.
    #[error("Invalid session config TOML: {0}")]
    ParseError(String),

    /// A value parsed but makes no sense, such as a zero timeout.
    #[error("Invalid session config: {0}")]
    InvalidValue(String),
}

/// How one prompt session behaves over its lifetime.
///
/// In TOML, durations are whole seconds:
///
/// ```toml
/// timeout_secs = 900
/// idle_timeout_secs = 120
/// close_policy = "delete_components"
/// acknowledge_interactions = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Total lifetime; the session closes when it elapses.
    #[serde(
        rename = "timeout_secs",
        with = "optional_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    /// Maximum time without a successful commit.
    #[serde(
        rename = "idle_timeout_secs",
        with = "optional_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub idle_timeout: Option<Duration>,

    pub close_policy: ClosePolicy,

    /// Acknowledge every routed interaction through the adaptor.
    pub acknowledge_interactions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            idle_timeout: None,
            close_policy: ClosePolicy::default(),
            acknowledge_interactions: true,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig =
            toml::from_str(source).map_err(|err| ConfigError::ParseError(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|err| ConfigError::ParseError(err.to_string()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    pub fn with_close_policy(mut self, close_policy: ClosePolicy) -> Self {
        self.close_policy = close_policy;
        self
    }

    pub fn with_acknowledge_interactions(mut self, acknowledge: bool) -> Self {
        self.acknowledge_interactions = acknowledge;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue("timeout_secs must be positive".into()));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue(
                "idle_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
