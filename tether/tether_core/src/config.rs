//! Runtime configuration.
//!
//! Handles loading and validating the settings that shape how the runtime
//! creates threads and how the C ABI reacts to misuse. Configuration is
//! stored as TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! thread_name_prefix = "app-worker"
//! stack_size = 262144
//! invalid_join = "set_error"
//! invalid_join_error_code = 77
//! ```

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Environment variable naming the configuration file(s) for the ABI
/// runtime, separated like `PATH` entries.
pub const CONFIG_ENV_VAR: &str = "TETHER_CONFIG";

/// Smallest stack size accepted for spawned threads.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// What joining an invalid, stale, or detached handle through the ABI does.
///
/// Joining such a handle is never a fault. The policy only decides whether
/// the mistake is silent, logged, or surfaced to the caller through its
/// error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidJoinPolicy {
    /// Do nothing.
    Ignore,

    /// Log a warning and do nothing else.
    #[default]
    Warn,

    /// Log a warning and write `invalid_join_error_code` into the calling
    /// thread's error slot.
    SetError,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Prefix for spawned thread names; threads are named `{prefix}-{id}`
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Stack size for spawned threads in bytes; the platform default when unset
    #[serde(default)]
    pub stack_size: Option<usize>,

    /// Reaction to joining a handle that cannot be joined
    #[serde(default)]
    pub invalid_join: InvalidJoinPolicy,

    /// Error code written under [`InvalidJoinPolicy::SetError`]
    #[serde(default = "default_invalid_join_error_code")]
    pub invalid_join_error_code: i64,
}

fn default_thread_name_prefix() -> String {
    "tether-worker".to_string()
}

fn default_invalid_join_error_code() -> i64 {
    -1
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: None,
            invalid_join: InvalidJoinPolicy::default(),
            invalid_join_error_code: default_invalid_join_error_code(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a file.
    ///
    /// With no path, or a path that does not exist, the defaults are
    /// returned. A file that exists but cannot be read, parsed, or validated
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No configuration file specified, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Configuration file not found: {}", path.display());
            return Ok(Self::default());
        }

        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Load several files in order, each layered over the ones before it.
    ///
    /// A later file overrides only the fields it sets to a non-default
    /// value. Missing files contribute nothing.
    pub fn load_layered<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut config = Self::default();
        for path in paths {
            config.merge(Self::load(Some(path.as_ref()))?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load the files named by [`CONFIG_ENV_VAR`], or the defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(paths) => Self::load_layered(std::env::split_paths(&paths)),
            None => Self::load(None),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.is_empty() {
            return Err(
                ConfigError::Invalid("Thread name prefix cannot be empty".to_string()).into(),
            );
        }

        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::Invalid(
                "Thread name prefix cannot contain NUL bytes".to_string(),
            )
            .into());
        }

        if let Some(stack_size) = self.stack_size {
            if stack_size < MIN_STACK_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "Stack size {} is below the minimum of {} bytes",
                    stack_size, MIN_STACK_SIZE
                ))
                .into());
            }
        }

        if self.invalid_join_error_code == 0 {
            return Err(ConfigError::Invalid(
                "Invalid join error code cannot be zero (zero means no error)".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Merge with another configuration, preferring the other's non-default values
    pub fn merge(&mut self, other: RuntimeConfig) {
        if other.thread_name_prefix != default_thread_name_prefix() {
            self.thread_name_prefix = other.thread_name_prefix;
        }

        if other.stack_size.is_some() {
            self.stack_size = other.stack_size;
        }

        if other.invalid_join != InvalidJoinPolicy::default() {
            self.invalid_join = other.invalid_join;
        }

        if other.invalid_join_error_code != default_invalid_join_error_code() {
            self.invalid_join_error_code = other.invalid_join_error_code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.thread_name_prefix, "tether-worker");
        assert_eq!(config.stack_size, None);
        assert_eq!(config.invalid_join, InvalidJoinPolicy::Warn);
        assert_eq!(config.invalid_join_error_code, -1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_parse_full_document() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            thread_name_prefix = "app"
            stack_size = 65536
            invalid_join = "set_error"
            invalid_join_error_code = 77
            "#,
        )
        .unwrap();

        assert_eq!(config.thread_name_prefix, "app");
        assert_eq!(config.stack_size, Some(65536));
        assert_eq!(config.invalid_join, InvalidJoinPolicy::SetError);
        assert_eq!(config.invalid_join_error_code, 77);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for document in [
            r#"thread_name_prefix = """#,
            "stack_size = 1024",
            "invalid_join_error_code = 0",
        ] {
            let result = RuntimeConfig::from_toml_str(document);
            assert!(
                matches!(result, Err(Error::Config(ConfigError::Invalid(_)))),
                "accepted {:?}",
                document
            );
        }
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let result = RuntimeConfig::from_toml_str(r#"invalid_join = "panic""#);
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseFailed(_)))));
    }

    #[test]
    fn test_merge() {
        let mut base = RuntimeConfig::default();
        base.merge(RuntimeConfig {
            stack_size: Some(MIN_STACK_SIZE),
            invalid_join: InvalidJoinPolicy::Ignore,
            ..Default::default()
        });

        assert_eq!(base.thread_name_prefix, "tether-worker");
        assert_eq!(base.stack_size, Some(MIN_STACK_SIZE));
        assert_eq!(base.invalid_join, InvalidJoinPolicy::Ignore);
        assert_eq!(base.invalid_join_error_code, -1);
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(RuntimeConfig::load(None).unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let config = RuntimeConfig::load(Some(Path::new("/nonexistent/tether.toml"))).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
