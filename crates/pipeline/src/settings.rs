//! Tunables for a pipeline instance.
//!
//! Every field has a default, so a partial `[pipeline]` table in the
//! configuration file is enough.

use serde::{Deserialize, Serialize};

use crate::normalizer::NormalizerOptions;
use crate::profile::{DEFAULT_MERGE_THRESHOLD, DEFAULT_SYNONYM_THRESHOLD};
use crate::PipelineError;

fn invalid(message: String) -> PipelineError {
    PipelineError::ConfigurationError { message }
}

/// Character budgets for the text sent with each generative request.
///
/// Text beyond a budget is cut as a character prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptBudgets {
    pub metadata: usize,
    pub audit: usize,
    pub humanize: usize,
    pub headline: usize,
    pub subheadings: usize,
    pub meta_description: usize,
    pub schema_markup: usize,
}

impl Default for PromptBudgets {
    fn default() -> Self {
        Self {
            metadata: 2000,
            audit: 2000,
            humanize: 1500,
            headline: 500,
            subheadings: 1500,
            meta_description: 1000,
            schema_markup: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub normalizer: NormalizerOptions,
    pub budgets: PromptBudgets,
    /// Global switch; an article is only auto-published when its submission
    /// asks for it and this is on.
    pub auto_publish_enabled: bool,
    /// Seed for the humanizer's word variation. Unset means seeded from entropy.
    pub humanizer_seed: Option<u64>,
    /// How long resolved category and tag IDs stay cached.
    pub term_cache_ttl_secs: u64,
    /// Characters of the submitted article kept in the run log.
    pub log_excerpt_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            normalizer: NormalizerOptions::default(),
            budgets: PromptBudgets::default(),
            auto_publish_enabled: false,
            humanizer_seed: None,
            term_cache_ttl_secs: 3600,
            log_excerpt_chars: 1000,
        }
    }
}

impl PromptBudgets {
    fn validate(&self) -> Result<(), PipelineError> {
        let budgets = [
            ("metadata", self.metadata),
            ("audit", self.audit),
            ("humanize", self.humanize),
            ("headline", self.headline),
            ("subheadings", self.subheadings),
            ("meta_description", self.meta_description),
            ("schema_markup", self.schema_markup),
        ];
        match budgets.iter().find(|(_, chars)| *chars == 0) {
            Some((name, _)) => Err(invalid(format!("budgets.{name} must be at least 1"))),
            None => Ok(()),
        }
    }
}

impl PipelineSettings {
    /// # Errors
    ///
    /// [`PipelineError::ConfigurationError`] for a zero prompt budget or a
    /// zero run-log excerpt length.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.budgets.validate()?;
        if self.log_excerpt_chars == 0 {
            return Err(invalid("log_excerpt_chars must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Thresholds for the out-of-band taxonomy learning operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutolearnSettings {
    pub synonym_threshold: f64,
    pub merge_threshold: f64,
}

impl Default for AutolearnSettings {
    fn default() -> Self {
        Self {
            synonym_threshold: DEFAULT_SYNONYM_THRESHOLD,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

impl AutolearnSettings {
    /// # Errors
    ///
    /// [`PipelineError::ConfigurationError`] when a threshold lies outside
    /// `[0, 1]`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, value) in [
            ("synonym_threshold", self.synonym_threshold),
            ("merge_threshold", self.merge_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        Ok(())
    }
}

/// Returns the first `max_chars` characters of `text`.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
