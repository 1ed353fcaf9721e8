//! The single path from stages to the generative model.

use std::sync::Arc;
use std::time::Instant;

use pipeline::{GenerationError, GenerationRequest, ModelName, TextGenerator};
use serde_json::Value;
use tracing::{debug, warn};

/// Wraps the [`TextGenerator`] port with per-call logging.
///
/// Retry and timeout live in the generator itself; the gateway only reports
/// how each call went so every stage's model traffic shows up uniformly.
#[derive(Clone)]
pub struct LlmGateway {
    generator: Arc<dyn TextGenerator>,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("model", &self.generator.model_name())
            .finish()
    }
}

impl LlmGateway {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn model_name(&self) -> ModelName {
        self.generator.model_name()
    }

    /// Requests free text. `purpose` names the call in logs.
    pub async fn text(
        &self,
        purpose: &'static str,
        request: GenerationRequest,
    ) -> Result<String, GenerationError> {
        let started = Instant::now();
        let result = self.generator.generate(&request).await;
        report(purpose, started, result.as_ref().err());
        result
    }

    /// Requests a JSON value. `purpose` names the call in logs.
    pub async fn json(
        &self,
        purpose: &'static str,
        request: GenerationRequest,
    ) -> Result<Value, GenerationError> {
        let started = Instant::now();
        let result = self.generator.generate_json(&request).await;
        report(purpose, started, result.as_ref().err());
        result
    }
}

fn report(purpose: &'static str, started: Instant, error: Option<&GenerationError>) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match error {
        None => debug!(purpose, elapsed_ms, "model call succeeded"),
        Some(err) => warn!(purpose, elapsed_ms, error = %err, "model call failed"),
    }
}
