//! Port traits: the capabilities the pipeline consumes but does not implement.
//!
//! Infrastructure crates provide the implementations:
//!
//! | Port | Implemented by |
//! |------|----------------|
//! | [`TextGenerator`] | `llm` (OpenAI-compatible chat completions) |
//! | [`ProfileStore`] | `storage` (JSON file) |
//! | [`RunLogSink`] | `storage` (JSON lines) |
//! | [`PublishingTarget`] | `publisher` (WordPress REST) |
//! | [`Clock`] | [`SystemClock`] here; [`FixedClock`] for tests |

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    GenerationError, ModelName, PostId, PublishError, RunId, StoreError, TaxonomyProfile, TermId,
    Timestamp,
};

// ---------------------------------------------------------------------------
// Generative text
// ---------------------------------------------------------------------------

/// One request to the generative text capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// User message.
    pub prompt: String,
    /// System framing, if any.
    pub system_prompt: Option<String>,
    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
    /// Overrides the provider's default temperature.
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Creates a plain-text request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            json_mode: false,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Marks the request as expecting a JSON object.
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// The generative text capability.
///
/// Implementations own their timeout and retry-with-backoff policy; callers
/// treat each call as bounded and convert any returned error into a local
/// fallback.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates free text for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Generates a JSON value for `request`.
    ///
    /// The default implementation forces JSON mode, calls [`Self::generate`],
    /// and parses the answer with [`parse_json_payload`].
    async fn generate_json(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError> {
        let request = request.clone().json();
        let raw = self.generate(&request).await?;
        parse_json_payload(&raw)
    }

    /// Name of the model serving requests, recorded in the run log.
    fn model_name(&self) -> ModelName;
}

/// Parses a model answer as JSON, tolerating a surrounding markdown code fence.
///
/// # Errors
///
/// [`GenerationError::MalformedResponse`] when the payload is not valid JSON.
pub fn parse_json_payload(raw: &str) -> Result<serde_json::Value, GenerationError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| GenerationError::MalformedResponse {
        message: format!("invalid JSON ({e})"),
    })
}

/// Removes a leading ```` ``` ```` / ```` ```json ```` fence and a trailing fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

// ---------------------------------------------------------------------------
// Run log
// ---------------------------------------------------------------------------

/// Final status of a run as recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

/// One run-outcome record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogRecord {
    pub run_id: RunId,
    /// The first characters of the submitted article.
    pub input_excerpt: String,
    /// Compact JSON summary of the outcome.
    pub output_summary: serde_json::Value,
    pub status: RunStatus,
    /// Wall-clock duration of the run, in milliseconds.
    pub execution_time_ms: f64,
    pub model: Option<ModelName>,
    pub error: Option<String>,
    pub recorded_at: Timestamp,
}

/// Destination for run-outcome records.
///
/// Fire-and-forget from the orchestrator's perspective: a failed write is
/// logged and otherwise ignored.
#[async_trait]
pub trait RunLogSink: Send + Sync {
    async fn record(&self, record: &RunLogRecord) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Taxonomy profile
// ---------------------------------------------------------------------------

/// Durable storage for the taxonomy learning profile.
///
/// Owned exclusively by the autolearner, which serializes every
/// load-mutate-save cycle.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads the persisted profile, or `None` if nothing has been persisted yet.
    async fn load(&self) -> Result<Option<TaxonomyProfile>, StoreError>;

    /// Replaces the persisted profile.
    async fn save(&self, profile: &TaxonomyProfile) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Publishing target
// ---------------------------------------------------------------------------

/// Visibility requested for a new post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Pending,
    Publish,
}

/// A post ready to be handed to the publishing target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category_refs: Vec<TermId>,
    pub tag_refs: Vec<TermId>,
    pub status: PostStatus,
}

/// The content-management system articles are published to.
#[async_trait]
pub trait PublishingTarget: Send + Sync {
    /// Finds a category by name (case-insensitive) or creates it.
    async fn ensure_category(&self, name: &str) -> Result<TermId, PublishError>;

    /// Finds a tag by name (case-insensitive) or creates it.
    async fn ensure_tag(&self, name: &str) -> Result<TermId, PublishError>;

    /// Creates a post and returns its identifier.
    async fn create_post(&self, draft: &PostDraft) -> Result<PostId, PublishError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the local wall-clock time used by date-sensitive rules.
pub trait Clock: Send + Sync {
    fn now_local(&self) -> NaiveDateTime;
}

/// The machine's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.0
    }
}
