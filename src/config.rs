use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_QUALITY: &str = "best";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub languages: Option<Vec<String>>,
    pub prefer_generated: Option<bool>,
    pub output_path: Option<PathBuf>,
    pub quality: Option<String>,
}

impl Config {
    /// Load config from ~/.config/youtube-tools/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Model to use, CLI flag first
    pub fn model_or(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Caption languages in priority order, CLI flags first
    pub fn languages_or(&self, flags: &[String]) -> Vec<String> {
        if !flags.is_empty() {
            return flags.to_vec();
        }
        self.languages
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| vec!["en".to_string()])
    }

    pub fn quality_or(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.quality.clone())
            .unwrap_or_else(|| DEFAULT_QUALITY.to_string())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("youtube-tools")
        .join("config.toml")
}
