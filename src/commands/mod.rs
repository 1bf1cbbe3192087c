pub mod ask;
pub mod chat;
pub mod count;
pub mod init;

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::gateway::HttpGateway;
use crate::params::CallParams;
use crate::session::Session;
use crate::tokens::TiktokenOracle;

/// Settings shared by the commands that open a session.
#[derive(Debug, Default)]
pub struct SessionOptions {
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl SessionOptions {
    /// Resolve config with command-line values taking precedence.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::discover(self.config_path.as_deref())?;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(system) = &self.system {
            config.system_prompt = system.clone();
        }
        let flags = CallParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..CallParams::default()
        };
        config.params = config.params.merged(&flags);
        config.validate()?;
        Ok(config)
    }

    /// Open a session against the configured HTTP endpoint.
    pub fn open(&self) -> Result<Session<HttpGateway>> {
        let config = self.resolve_config()?;
        let gateway = HttpGateway::from_config(&config.api)?;
        Session::from_config(&config, gateway, TiktokenOracle::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpt-chat.toml");
        std::fs::write(
            &path,
            "model = \"gpt-4\"\nsystem_prompt = \"file\"\n[params]\ntemperature = 0.3\nmax_tokens = 50\n",
        )
        .unwrap();

        let config = SessionOptions {
            config_path: Some(path),
            model: Some("gpt-3.5-turbo".into()),
            temperature: Some(0.9),
            ..SessionOptions::default()
        }
        .resolve_config()
        .unwrap();

        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.system_prompt, "file");
        assert_eq!(config.params.temperature, Some(0.9));
        assert_eq!(config.params.max_tokens, Some(50));
    }

    #[test]
    fn invalid_model_flag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpt-chat.toml");
        Config::default().save(&path).unwrap();
        let err = SessionOptions {
            config_path: Some(path),
            model: Some("davinci".into()),
            ..SessionOptions::default()
        }
        .resolve_config()
        .unwrap_err();
        assert!(err.is_user_error());
    }
}
