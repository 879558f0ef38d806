//! Game configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aivault_engine::ConfigError;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::llm_client::{LlmConfig, LlmProvider};

/// Runtime configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Puzzle catalog document.
    #[serde(default = "default_catalog_path")]
    catalog_path: PathBuf,

    /// Save file location.
    #[serde(default = "default_save_path")]
    save_path: PathBuf,

    /// Remote assistant provider. Hints stay local when unset.
    #[serde(default)]
    ai_provider: Option<LlmProvider>,

    /// Model override; the provider default is used when unset.
    #[serde(default)]
    ai_model: Option<String>,

    /// Maximum tokens for assistant replies.
    #[serde(default = "default_max_tokens")]
    #[getter(copy)]
    ai_max_tokens: u32,

    /// Upper bound on one remote hint or evaluation call.
    #[serde(default = "default_hint_timeout_ms")]
    #[getter(copy)]
    hint_timeout_ms: u64,

    /// Quiet period before a save is written.
    #[serde(default = "default_autosave_debounce_ms")]
    #[getter(copy)]
    autosave_debounce_ms: u64,

    /// Pause between a solved puzzle and the next one.
    #[serde(default = "default_pacing_ms")]
    #[getter(copy)]
    pacing_ms: u64,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/puzzles.json")
}

fn default_save_path() -> PathBuf {
    PathBuf::from("aivault_save.json")
}

fn default_max_tokens() -> u32 {
    150
}

fn default_hint_timeout_ms() -> u64 {
    10_000
}

fn default_autosave_debounce_ms() -> u64 {
    1_000
}

fn default_pacing_ms() -> u64 {
    1_500
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            save_path: default_save_path(),
            ai_provider: None,
            ai_model: None,
            ai_max_tokens: default_max_tokens(),
            hint_timeout_ms: default_hint_timeout_ms(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl GameConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(catalog = %config.catalog_path.display(), "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Overrides the catalog location.
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    /// Overrides the save location.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    /// Overrides the transition pacing.
    pub fn with_pacing_ms(mut self, pacing_ms: u64) -> Self {
        self.pacing_ms = pacing_ms;
        self
    }

    /// Hint call bound as a duration.
    pub fn hint_timeout(&self) -> Duration {
        Duration::from_millis(self.hint_timeout_ms)
    }

    /// Autosave quiet period as a duration.
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Transition pacing as a duration.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Builds the remote assistant configuration.
    ///
    /// `Ok(None)` when no provider is configured. The key comes from the
    /// provider's environment variable, never from the file.
    #[instrument(skip(self), fields(provider = ?self.ai_provider))]
    pub fn create_llm_config(&self) -> Result<Option<LlmConfig>, ConfigError> {
        self.create_llm_config_with(|var| std::env::var(var).ok())
    }

    /// Like [`GameConfig::create_llm_config`] with a custom key lookup.
    pub fn create_llm_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<LlmConfig>, ConfigError> {
        let Some(provider) = self.ai_provider else {
            debug!("No AI provider configured");
            return Ok(None);
        };
        let var = provider.api_key_var();
        let api_key = lookup(var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                warn!(var, "API key not set; remote assistant disabled");
                ConfigError::new(format!("{} environment variable not set", var))
            })?;
        let model = self
            .ai_model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        Ok(Some(LlmConfig::new(
            provider,
            api_key,
            model,
            self.ai_max_tokens,
        )))
    }
}
