//! Settings storage
//!
//! Manages persistence of the remote generation settings: one record holding
//! the chat endpoint, the model name and the API key.

use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the saved settings record
pub const SETTINGS_FILE: &str = "flowable-ai-modeler-config.json";

/// Remote generation settings
///
/// Serialized as `{"endpoint", "model", "apiKey"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelerSettings {
    /// Chat-completion endpoint URL
    #[serde(default)]
    pub endpoint: String,
    /// Model name sent with each request
    #[serde(default)]
    pub model: String,
    /// Bearer token for the endpoint
    #[serde(default)]
    pub api_key: String,
}

/// Values that replace saved settings for one run (CLI flags, environment)
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl ModelerSettings {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let mut settings = Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        };
        settings.validate();
        settings
    }

    /// Trim surrounding whitespace from every field
    pub fn validate(&mut self) {
        for field in [&mut self.endpoint, &mut self.model, &mut self.api_key] {
            *field = field.trim().to_string();
        }
    }

    /// Remote generation is only used when all three values are set
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && !self.model.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }

    /// Apply per-run overrides
    pub fn merged(&self, overrides: &SettingsOverrides) -> Self {
        let pick = |value: &Option<String>, saved: &String| {
            value.clone().unwrap_or_else(|| saved.clone())
        };
        Self::new(
            pick(&overrides.endpoint, &self.endpoint),
            pick(&overrides.model, &self.model),
            pick(&overrides.api_key, &self.api_key),
        )
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let count = self.api_key.chars().count();
        if count == 0 {
            return String::new();
        }
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

/// Get the settings file path
fn get_settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

/// Load settings from disk
///
/// Returns default settings if the file doesn't exist or is corrupted
pub fn load_settings(data_dir: &Path) -> ModelerSettings {
    match load_settings_internal(data_dir) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            ModelerSettings::default()
        }
    }
}

/// Internal settings loading with error propagation
fn load_settings_internal(data_dir: &Path) -> Result<ModelerSettings, StorageError> {
    let path = get_settings_path(data_dir);

    if !path.exists() {
        tracing::info!("Settings file not found, using defaults");
        return Ok(ModelerSettings::default());
    }

    let json = fs::read_to_string(&path)?;
    let mut settings: ModelerSettings = serde_json::from_str(&json)?;
    settings.validate();

    tracing::debug!("Loaded settings from disk");
    Ok(settings)
}

/// Save settings to disk
pub fn save_settings(data_dir: &Path, settings: &ModelerSettings) -> Result<(), StorageError> {
    let path = get_settings_path(data_dir);

    // Ensure the parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut settings = settings.clone();
    settings.validate();
    let json = serde_json::to_string_pretty(&settings)?;
    fs::write(path, json)?;

    tracing::debug!("Saved settings to disk");
    Ok(())
}
