use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use colored::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::colors;
use crate::error::{DeclutterError, Result};
use crate::DEFAULT_ARCHIVE_NAME;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "DECLUTTER_MODEL";
pub const ENDPOINT_VAR: &str = "DECLUTTER_ENDPOINT";

const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub endpoint: String,
    /// No timeout when unset; a hung service then blocks the command.
    pub request_timeout_secs: Option<u64>,
    pub delete_after_archive: bool,
    pub archive_name: String,

    /// Never written to disk; comes from the environment or `.env`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            delete_after_archive: true,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DeclutterError::Config("could not find home directory".to_string()))?;
        Ok(home.join(".declutter.json"))
    }

    /// Load settings from `~/.declutter.json`, then `.env`, then the environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let mut config = Self::from_file(&Self::config_path()?)?;
        config.apply_env(|name| env::var(name).ok());
        Ok(config)
    }

    /// Read a settings file; a missing file means defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|e| DeclutterError::fs(path, e))?;
        serde_json::from_str(&data)
            .map_err(|e| DeclutterError::Config(format!("{} is not valid: {}", path.display(), e)))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(endpoint) = lookup(ENDPOINT_VAR).filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DeclutterError::Config(format!(
                "{API_KEY_VAR} is not set; add it to your environment or a .env file"
            )))
    }

    /// Save config to disk via a temp file and rename
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| DeclutterError::Config(e.to_string()))?;
        fs::write(&temp_path, &data).map_err(|e| DeclutterError::fs(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| DeclutterError::fs(path, e))?;
        Ok(())
    }

    fn masked_key(&self) -> String {
        match self.api_key.as_deref() {
            Some(key) if key.chars().count() > 4 => {
                format!("{}…", key.chars().take(4).collect::<String>())
            }
            Some(_) => "set".to_string(),
            None => "not set".to_string(),
        }
    }

    /// Display configuration
    pub fn display(&self) {
        println!("{}", "⚙️  CONFIGURATION".bold().color(colors::HEADER));
        println!("{}", "─".repeat(50).color(colors::PATH));
        if let Ok(path) = Self::config_path() {
            println!("Settings file: {}", path.display().to_string().color(colors::PATH));
        }
        println!("Model: {}", self.model.color(colors::SUCCESS));
        println!("Endpoint: {}", self.endpoint.color(colors::PATH));
        println!("Request timeout: {}", match self.request_timeout_secs {
            Some(secs) => format!("{secs}s"),
            None => "none".to_string(),
        });
        println!("Delete duplicates after archiving: {}", self.delete_after_archive);
        println!("Archive name: {}", self.archive_name);
        let key = self.masked_key();
        if self.api_key.is_some() {
            println!("{}: {}", API_KEY_VAR, key.color(colors::SUCCESS));
        } else {
            println!("{}: {}", API_KEY_VAR, key.color(colors::WARNING));
        }
    }
}
