// src/config.rs

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Model-provider settings. The model id itself is fixed; only the key
/// and an optional endpoint override live here.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

pub fn load() -> Config {
    let Ok(raw) = fs::read_to_string(config_file()) else {
        return Config::default();
    };
    toml::from_str(&raw).unwrap_or_default()
}

pub fn save(cfg: &Config) -> Result<(), Error> {
    let path = config_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
    }

    let text = toml::to_string(cfg).map_err(|e| Error::Storage(e.to_string()))?;
    fs::write(path, text).map_err(|e| Error::Storage(e.to_string()))
}

fn config_file() -> PathBuf {
    let mut base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("testloom");
    base.push("config.toml");
    base
}
