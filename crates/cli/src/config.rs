//! Application configuration: one TOML file plus environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use llm::LlmConfig;
use pipeline::settings::{AutolearnSettings, PipelineSettings};
use publisher::WordPressConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "editorial.toml";

/// File locations for the persisted state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub profile_path: PathBuf,
    pub run_log_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from("data/taxonomy_profile.json"),
            run_log_path: PathBuf::from("data/runs.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineSettings,
    pub storage: StorageConfig,
    pub autolearn: AutolearnSettings,
    /// Absent means no publishing target; runs never auto-publish.
    pub publisher: Option<WordPressConfig>,
}

impl AppConfig {
    /// Reads `path`, then applies environment overrides.
    ///
    /// A missing file is only an error when the caller named it explicitly;
    /// the default location falls back to built-in defaults.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw)
                .with_context(|| format!("invalid configuration in {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                Self::default()
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("cannot read configuration {}", path.display()))
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Range checks on the pipeline and learning settings.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.autolearn.validate()?;
        Ok(())
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Overrides secrets and endpoints from `lookup`; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(url) = var("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }

        let base_url = var("PUBLISHER_BASE_URL");
        let username = var("PUBLISHER_USERNAME");
        let password = var("PUBLISHER_PASSWORD");
        if base_url.is_none() && username.is_none() && password.is_none() {
            return;
        }
        let publisher = self.publisher.get_or_insert_with(WordPressConfig::default);
        if let Some(url) = base_url {
            publisher.base_url = url;
        }
        if let Some(user) = username {
            publisher.username = user;
        }
        if let Some(pass) = password {
            publisher.password = pass;
        }
    }

    /// The publisher settings, if they are complete enough to use.
    pub fn usable_publisher(&self) -> Option<&WordPressConfig> {
        self.publisher.as_ref().filter(|p| p.is_complete())
    }
}
