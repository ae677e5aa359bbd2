use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "info.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub client_id: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("client id required in {0}")]
    MissingClientId(String),
}

impl Config {
    /// Load the service credentials. A missing or unreadable file is
    /// replaced with an empty template for the user to fill in.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let config = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(_) => Self::write_template(path)?,
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::write_template(path)?,
            Err(e) => return Err(e.into()),
        };

        if config.client_id.is_empty() {
            return Err(ConfigError::MissingClientId(path.display().to_string()));
        }

        Ok(config)
    }

    fn write_template(path: &Path) -> Result<Config, ConfigError> {
        let config = Config::default();
        fs::write(path, serde_json::to_string_pretty(&config)?)?;

        Ok(config)
    }
}
