use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::model::ModelIdentity;
use crate::params::CallParams;

pub const CONFIG_FILE_NAME: &str = "gpt-chat.toml";

/// Top-level configuration for gpt-chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub system_prompt: String,
    pub api: ApiConfig,
    /// Default call parameters for every request.
    pub params: CallParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

// --- Defaults ---

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            system_prompt: "You are a helpful assistant.".into(),
            api: ApiConfig::default(),
            params: CallParams::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 60,
        }
    }
}

// --- Config methods ---

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatError::io(format!("reading config from '{}'", path.display()), e)
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ChatError::config_with_source("failed to parse config", e))?;
        config.validate()?;
        debug!(path = %path.display(), model = %config.model, "loaded config");
        Ok(config)
    }

    /// Load the discovered config file, or defaults when there is none.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match (find_config_file(explicit), explicit) {
            (Some(path), _) => Self::load(&path),
            (None, Some(missing)) => Err(ChatError::config(format!(
                "config file '{}' not found",
                missing.display()
            ))),
            (None, None) => Ok(Self::default()),
        }
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChatError::config_with_source("failed to serialize config", e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChatError::io(
                    format!("creating config directory '{}'", parent.display()),
                    e,
                )
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| ChatError::io(format!("writing config to '{}'", path.display()), e))
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<()> {
        ModelIdentity::parse(&self.model)?;
        if self.api.base_url.trim().is_empty() {
            return Err(ChatError::validation("api.base_url", "must not be empty"));
        }
        if self.api.api_key_env.trim().is_empty() {
            return Err(ChatError::validation("api.api_key_env", "must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(ChatError::validation(
                "api.timeout_secs",
                "must be greater than 0",
            ));
        }
        self.params.validate()
    }

    /// Merge overrides on top of this config (non-default fields win).
    pub fn merge(&mut self, overrides: Config) {
        let defaults = Config::default();
        if overrides.model != defaults.model {
            self.model = overrides.model;
        }
        if overrides.system_prompt != defaults.system_prompt {
            self.system_prompt = overrides.system_prompt;
        }
        if overrides.api != defaults.api {
            self.api = overrides.api;
        }
        if overrides.params != defaults.params {
            self.params = self.params.merged(&overrides.params);
        }
    }
}

/// Builder for constructing Config with selective overrides.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn with_params(mut self, params: CallParams) -> Self {
        self.config.params = params;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Discover the config file using standard search order:
/// 1. Explicit path (if provided)
/// 2. ./gpt-chat.toml
/// 3. ~/.gpt-chat.toml
/// 4. XDG config dir
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        return None;
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(home) = dirs_home() {
        let home_config = home.join(format!(".{CONFIG_FILE_NAME}"));
        if home_config.exists() {
            return Some(home_config);
        }
    }

    if let Some(xdg) = user_config_path() {
        if xdg.exists() {
            return Some(xdg);
        }
    }

    None
}

/// Per-user config location in the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gpt-chat").map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
