//! Configuration loading
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. `jss.toml` in the working directory, or the file named by
//!    `--config` / `JSS_CONFIG_PATH` (which must then exist)
//! 3. Environment variables such as `JSS_VM__MAX_CALL_DEPTH=5000`
//!
//! Call `dotenvy::dotenv()` before loading to pick up a `.env` file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ::config::{Config as ConfigSource, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::interpreter::vm::DEFAULT_MAX_CALL_DEPTH;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "JSS_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vm: VmConfig,
    pub repl: ReplConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Nested script calls allowed before a stack overflow error
    pub max_call_depth: usize,
    /// Print the disassembly of every compiled program before running it
    pub debug: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    pub ps1: String,
    /// Prompt shown while a statement is still open
    pub ps2: String,
    /// Where to keep line history. No history is saved when unset.
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            ps1: ">>> ".to_string(),
            ps2: "... ".to_string(),
            history_file: None,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with the default search path and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.vm.max_call_depth == 0 {
            return Err(ConfigError::Message(
                "vm.max_call_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from an explicit file only, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::builder()
            .config_path(Some(path.to_path_buf()))
            .env_vars(HashMap::new())
            .build()
    }
}

/// Builder for loading configuration with overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    max_call_depth: Option<usize>,
    debug: Option<bool>,
}

impl ConfigBuilder {
    /// Read this file instead of `jss.toml`. Falls back to `JSS_CONFIG_PATH`.
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Use these variables instead of the process environment
    pub fn env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Override the call depth limit after every other source
    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn debug(mut self, debug: Option<bool>) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let explicit_path = self.config_path.clone().or_else(|| self.env_config_path());

        let mut builder = ConfigSource::builder();
        builder = match &explicit_path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name("jss").required(false)),
        };
        builder = builder.add_source(
            Environment::with_prefix("JSS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let mut config: Config = builder.build()?.try_deserialize()?;
        if let Some(depth) = self.max_call_depth {
            config.vm.max_call_depth = depth;
        }
        if let Some(debug) = self.debug {
            config.vm.debug = debug;
        }
        config.validate()?;

        tracing::debug!(
            path = ?explicit_path,
            max_call_depth = config.vm.max_call_depth,
            "loaded configuration"
        );
        Ok(config)
    }

    fn env_config_path(&self) -> Option<PathBuf> {
        match &self.env {
            Some(vars) => vars.get(CONFIG_PATH_ENV).map(PathBuf::from),
            None => std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from),
        }
    }
}
