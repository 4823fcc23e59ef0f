//! Guard configuration with environment variable and config file support.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set with the `with_*` builder methods after loading
//! 2. **Environment variables**: values from `RACEGUARD_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: [`GuardConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `RACEGUARD_ALLOW_OVERHEAD` | `bool` | `allow_overhead` |
//! | `RACEGUARD_UNHANDLED_REJECTIONS` | `warn` \| `strict` | `unhandled` |

use core::fmt;
use core::str::FromStr;

/// Environment variable name for the overhead toggle.
pub const ENV_ALLOW_OVERHEAD: &str = "RACEGUARD_ALLOW_OVERHEAD";
/// Environment variable name for the unhandled-rejection policy.
pub const ENV_UNHANDLED_REJECTIONS: &str = "RACEGUARD_UNHANDLED_REJECTIONS";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable or key held a value of the wrong shape.
    #[error("invalid value for {var}: expected {expected}, got {got:?}")]
    InvalidValue {
        /// The variable or key name.
        var: String,
        /// Description of the accepted values.
        expected: &'static str,
        /// The rejected value.
        got: String,
    },
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`GuardConfig`].
    #[error("failed to parse TOML config: {0}")]
    Parse(String),
}

/// What happens to a diagnostic that no listener observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "lowercase"))]
pub enum UnhandledPolicy {
    /// Escalate to warnings on standard error and keep running.
    #[default]
    Warn,
    /// Escalate, then terminate the process.
    Strict,
}

impl UnhandledPolicy {
    /// Returns true for [`UnhandledPolicy::Strict`].
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl FromStr for UnhandledPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "strict" => Ok(Self::Strict),
            _ => Err(ConfigError::InvalidValue {
                var: ENV_UNHANDLED_REJECTIONS.to_string(),
                expected: "warn or strict",
                got: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UnhandledPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warn => "warn",
            Self::Strict => "strict",
        })
    }
}

/// Configuration read once when a guard is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardConfig {
    /// Always attach an observer, even to operations that have already
    /// succeeded and therefore can never fault.
    pub allow_overhead: bool,
    /// Policy for diagnostics that no listener observed.
    pub unhandled: UnhandledPolicy,
}

impl GuardConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allow_overhead: false,
            unhandled: UnhandledPolicy::Warn,
        }
    }

    /// Sets `allow_overhead`.
    #[must_use]
    pub const fn with_allow_overhead(mut self, allow: bool) -> Self {
        self.allow_overhead = allow;
        self
    }

    /// Sets the unhandled-rejection policy.
    #[must_use]
    pub const fn with_unhandled(mut self, policy: UnhandledPolicy) -> Self {
        self.unhandled = policy;
        self
    }

    /// Loads defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(read_env)?;
        Ok(config)
    }

    /// Applies the `RACEGUARD_*` environment variables to this config.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(read_env)
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Only variables for which `lookup` returns a value are applied.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup(ENV_ALLOW_OVERHEAD) {
            self.allow_overhead = parse_bool(ENV_ALLOW_OVERHEAD, &val)?;
        }
        if let Some(val) = lookup(ENV_UNHANDLED_REJECTIONS) {
            self.unhandled = val.parse()?;
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var_name.to_string(),
            expected: "bool (true/false/1/0/yes/no)",
            got: val.to_string(),
        }),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable guard configuration.
///
/// ```toml
/// [guard]
/// allow_overhead = true
/// unhandled_rejections = "strict"
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct GuardTomlConfig {
    /// Guard settings.
    #[serde(default)]
    pub guard: GuardToml,
}

/// Guard section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct GuardToml {
    /// Always attach observers.
    pub allow_overhead: Option<bool>,
    /// Policy for unobserved diagnostics.
    pub unhandled_rejections: Option<UnhandledPolicy>,
}

/// Parse a TOML string into a [`GuardTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<GuardTomlConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read and parse a TOML file into a [`GuardTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<GuardTomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_toml_str(&content)
}

#[cfg(feature = "config-file")]
impl GuardConfig {
    /// Applies the values present in a parsed TOML config.
    pub fn apply_toml(&mut self, toml: &GuardTomlConfig) {
        if let Some(v) = toml.guard.allow_overhead {
            self.allow_overhead = v;
        }
        if let Some(v) = toml.guard.unhandled_rejections {
            self.unhandled = v;
        }
    }

    /// Loads defaults, then the TOML file at `path`, then the environment.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_toml(&parse_toml_file(path)?);
        config.apply_env_overrides()?;
        Ok(config)
    }
}
