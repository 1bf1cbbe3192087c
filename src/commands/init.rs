use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{ChatError, Result};

/// Options for the `init` command.
pub struct InitOptions {
    pub path: Option<PathBuf>,
    pub model: Option<String>,
    pub force: bool,
}

/// Result of a successful `init` operation.
#[derive(Debug)]
pub struct InitResult {
    pub config_path: PathBuf,
    pub overwritten: bool,
}

/// Run the init command: write a default config file.
pub fn run(options: InitOptions) -> Result<InitResult> {
    let config_path = options
        .path
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    if config_path.is_dir() {
        return Err(ChatError::validation(
            "path",
            format!("'{}' is a directory", config_path.display()),
        ));
    }

    let exists = config_path.exists();
    if exists && !options.force {
        return Err(ChatError::config(format!(
            "config already exists at '{}' (use --force to overwrite)",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    if let Some(model) = options.model {
        config.model = model;
    }
    config.save(&config_path)?;

    Ok(InitResult {
        config_path,
        overwritten: exists,
    })
}
