use crate::codegen::GenerateOptions;
use crate::errors::ConfigError;
use crate::logging::{LogConfig, LogFormat, LogOutput};
use crate::types::is_ident;
use rgo_runtime::ViolationPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

/// File name looked for by [`Config::discover`].
pub const CONFIG_FILE: &str = "rgo.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generate: GenerateConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Default output file for `rgo generate`; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_runtime_path")]
    pub runtime_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// `abort` or `panic`.
    #[serde(default = "default_policy")]
    pub violation_policy: String,

    /// Collect before every allocation in `rgo pack`.
    #[serde(default)]
    pub torture: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Log to daily-rolling files here instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output: None,
            prefix: default_prefix(),
            runtime_path: default_runtime_path(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            violation_policy: default_policy(),
            torture: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

fn default_prefix() -> String {
    GenerateOptions::default().prefix
}

fn default_runtime_path() -> String {
    GenerateOptions::default().runtime_path
}

fn default_policy() -> String {
    "abort".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_at(&content, path)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::parse_at(content, Path::new(CONFIG_FILE))
    }

    fn parse_at(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Finds `rgo.toml` in `start` or the nearest parent that has one.
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Loads the nearest `rgo.toml` above the working directory, or the
    /// defaults when there is none.
    pub fn discover() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        match Self::find_from(&cwd) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Checks the values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy()?;
        self.log_level()?;
        if !is_ident(&self.generate.prefix) {
            return Err(invalid("generate.prefix", &self.generate.prefix));
        }
        if self.generate.runtime_path.is_empty() {
            return Err(invalid("generate.runtime_path", ""));
        }
        Ok(())
    }

    pub fn policy(&self) -> Result<ViolationPolicy, ConfigError> {
        ViolationPolicy::parse(&self.runtime.violation_policy)
            .ok_or_else(|| invalid("runtime.violation_policy", &self.runtime.violation_policy))
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.logging.level).map_err(|_| invalid("logging.level", &self.logging.level))
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            prefix: self.generate.prefix.clone(),
            runtime_path: self.generate.runtime_path.clone(),
        }
    }

    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        let output = match &self.logging.directory {
            Some(directory) => LogOutput::File {
                directory: directory.clone(),
                prefix: "rgo.log".to_string(),
            },
            None => LogOutput::Stderr,
        };
        Ok(LogConfig::new()
            .with_level(self.log_level()?)
            .with_format(self.logging.format)
            .with_output(output))
    }

    /// Applies `RGO_LOG_LEVEL`, `RGO_LOG_JSON` and `RGO_LOG_FILE`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// [`Config::apply_env_overrides`] with an explicit lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(level) = lookup("RGO_LOG_LEVEL") {
            self.logging.level = level;
            self.log_level()?;
        }
        if let Some(json) = lookup("RGO_LOG_JSON") {
            match json.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.format = LogFormat::Json,
                "0" | "false" | "no" | "" => {}
                _ => return Err(invalid("RGO_LOG_JSON", &json)),
            }
        }
        if let Some(dir) = lookup("RGO_LOG_FILE") {
            self.logging.directory = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Generate default configuration file content
    pub fn generate_default() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(ConfigError::Serialize)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}
