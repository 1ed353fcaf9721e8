//! Model-backed analysis: metadata extraction and the editorial audit.

use async_trait::async_trait;
use pipeline::results::{AuditResult, Degradable, MetadataResult};
use pipeline::settings::char_prefix;
use pipeline::{GenerationRequest, PipelineError, StageName};
use serde_json::Value;
use tracing::{info, warn};

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{Stage, Staged};

/// Asks the model for a JSON object and reads it with `parse`, falling back to
/// the degraded value when the call fails or the answer does not conform.
async fn json_or_degraded<T: Degradable>(
    gateway: &LlmGateway,
    purpose: &'static str,
    request: GenerationRequest,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> Staged<T> {
    match gateway.json(purpose, request).await {
        Ok(value) => match parse(&value) {
            Some(result) => Staged::completed(result),
            None => {
                warn!(purpose, "model answer was not a JSON object, using fallback");
                Staged::degraded(T::degraded(), "model answer was not a JSON object")
            }
        },
        Err(err) => Staged::degraded(T::degraded(), err.to_string()),
    }
}

/// Stage 2: categories, tags, entities and tone.
#[derive(Debug, Clone)]
pub struct MetadataStage {
    gateway: LlmGateway,
    budget: usize,
}

impl MetadataStage {
    pub fn new(gateway: LlmGateway, budget: usize) -> Self {
        Self { gateway, budget }
    }
}

#[async_trait]
impl Stage for MetadataStage {
    type Input = String;
    type Output = MetadataResult;

    fn name(&self) -> StageName {
        StageName::MetadataExtractor
    }

    async fn run(&self, text: &String) -> Result<Staged<MetadataResult>, PipelineError> {
        let request = GenerationRequest::new(prompts::metadata(char_prefix(text, self.budget)))
            .with_system(prompts::METADATA_SYSTEM);
        let staged = json_or_degraded(
            &self.gateway,
            "metadata",
            request,
            MetadataResult::from_model_value,
        )
        .await;
        info!(
            categories = staged.output.categories.len(),
            tags = staged.output.tags.len(),
            tone = %staged.output.tone,
            "metadata extracted"
        );
        Ok(staged)
    }
}

/// Stage 3: narrative quality, factuality, aggressiveness and neutrality.
#[derive(Debug, Clone)]
pub struct AuditStage {
    gateway: LlmGateway,
    budget: usize,
}

impl AuditStage {
    pub fn new(gateway: LlmGateway, budget: usize) -> Self {
        Self { gateway, budget }
    }
}

#[async_trait]
impl Stage for AuditStage {
    type Input = String;
    type Output = AuditResult;

    fn name(&self) -> StageName {
        StageName::QualityAuditor
    }

    async fn run(&self, text: &String) -> Result<Staged<AuditResult>, PipelineError> {
        let request = GenerationRequest::new(prompts::audit(char_prefix(text, self.budget)))
            .with_system(prompts::AUDIT_SYSTEM);
        let staged =
            json_or_degraded(&self.gateway, "audit", request, AuditResult::from_model_value).await;
        info!(
            narrative = staged.output.narrative_quality.score.as_f64(),
            neutrality = staged.output.neutrality.score.as_f64(),
            "audit complete"
        );
        Ok(staged)
    }
}
