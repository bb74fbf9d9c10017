use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::service::ServiceSettings;

pub const ENDPOINT_ENV: &str = "SCANLENS_ENDPOINT";
pub const API_KEY_ENV: &str = "SCANLENS_API_KEY";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the hosted functions (e.g. `https://<project>.supabase.co/functions/v1`)
    pub endpoint: Option<String>,
    /// Bearer token sent with every request
    pub api_key: Option<String>,
    /// Preferred translation language code (e.g. "es")
    pub language: Option<String>,
    /// UI theme name ("dark", "light", "monochrome")
    pub theme: Option<String>,
}

/// Keys accepted by `scanlens config set` / `unset`.
pub const CONFIG_KEYS: [&str; 4] = ["endpoint", "api-key", "language", "theme"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    UnknownKey(String),
    /// A required setting is neither in the config file nor the environment.
    Missing {
        key: &'static str,
        env: &'static str,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of: {})",
                CONFIG_KEYS.join(", ")
            ),
            SettingsError::Missing { key, env } => write!(
                f,
                "No {key} configured. Run `scanlens config set {key} <value>` or set {env}."
            ),
        }
    }
}

impl std::error::Error for SettingsError {}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('_', "-")
}

impl Config {
    fn slot_mut(&mut self, key: &str) -> Result<&mut Option<String>, SettingsError> {
        match normalize_key(key).as_str() {
            "endpoint" => Ok(&mut self.endpoint),
            "api-key" => Ok(&mut self.api_key),
            "language" => Ok(&mut self.language),
            "theme" => Ok(&mut self.theme),
            _ => Err(SettingsError::UnknownKey(key.to_string())),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        *self.slot_mut(key)? = Some(value.trim().to_string());
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), SettingsError> {
        *self.slot_mut(key)? = None;
        Ok(())
    }

    /// Endpoint and key for the hosted functions, with `SCANLENS_ENDPOINT`
    /// and `SCANLENS_API_KEY` taking precedence over the file.
    pub fn resolve_service(&self) -> Result<ServiceSettings, SettingsError> {
        self.resolve_service_with(|key| std::env::var(key).ok())
    }

    pub(crate) fn resolve_service_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ServiceSettings, SettingsError> {
        let pick = |from_env: Option<String>, from_file: &Option<String>| {
            from_env
                .or_else(|| from_file.clone())
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let endpoint = pick(env(ENDPOINT_ENV), &self.endpoint).ok_or(SettingsError::Missing {
            key: "endpoint",
            env: ENDPOINT_ENV,
        })?;
        let api_key = pick(env(API_KEY_ENV), &self.api_key).ok_or(SettingsError::Missing {
            key: "api-key",
            env: API_KEY_ENV,
        })?;

        Ok(ServiceSettings { endpoint, api_key })
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
