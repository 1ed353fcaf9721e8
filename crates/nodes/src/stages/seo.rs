use std::sync::Arc;

use async_trait::async_trait;
use pipeline::seo::{
    clean_headline, fallback_headline, fallback_meta_description, fallback_schema_markup,
    keyword_density, parse_subheadings, recommendations, SeoResult,
};
use pipeline::settings::{char_prefix, PromptBudgets};
use pipeline::{Clock, GenerationRequest, PipelineError, StageName};
use serde_json::Value;
use tracing::info;

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{Stage, Staged};

/// What the SEO stage needs from upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SeoInput {
    /// The humanized text.
    pub text: String,
    /// Categories as the metadata stage suggested them, before normalization.
    pub raw_categories: Vec<String>,
}

/// Stage 7: headline, subheadings, meta description, structured markup and
/// keyword density.
///
/// The four model-backed outputs fall back independently; the stage reports
/// degraded if any of them did.
pub struct SeoStage {
    gateway: LlmGateway,
    budgets: PromptBudgets,
    clock: Arc<dyn Clock>,
}

impl SeoStage {
    pub fn new(gateway: LlmGateway, budgets: PromptBudgets, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            budgets,
            clock,
        }
    }

    async fn headline(&self, text: &str, fallbacks: &mut Vec<String>) -> String {
        let request = GenerationRequest::new(prompts::headline(char_prefix(
            text,
            self.budgets.headline,
        )))
        .with_system(prompts::HEADLINE_SYSTEM);
        match self.gateway.text("headline", request).await {
            Ok(raw) => match clean_headline(&raw) {
                Some(headline) => return headline,
                None => fallbacks.push("headline: empty answer".to_string()),
            },
            Err(err) => fallbacks.push(format!("headline: {err}")),
        }
        fallback_headline(text)
    }

    async fn subheadings(&self, text: &str, fallbacks: &mut Vec<String>) -> Vec<String> {
        let request = GenerationRequest::new(prompts::subheadings(char_prefix(
            text,
            self.budgets.subheadings,
        )))
        .with_system(prompts::SUBHEADINGS_SYSTEM);
        match self.gateway.text("subheadings", request).await {
            Ok(raw) => {
                let subheadings = parse_subheadings(&raw);
                if subheadings.is_empty() {
                    fallbacks.push("subheadings: empty answer".to_string());
                }
                subheadings
            }
            Err(err) => {
                fallbacks.push(format!("subheadings: {err}"));
                Vec::new()
            }
        }
    }

    async fn meta_description(
        &self,
        headline: &str,
        text: &str,
        fallbacks: &mut Vec<String>,
    ) -> String {
        let request = GenerationRequest::new(prompts::meta_description(
            headline,
            char_prefix(text, self.budgets.meta_description),
        ))
        .with_system(prompts::META_DESCRIPTION_SYSTEM);
        match self.gateway.text("meta_description", request).await {
            Ok(raw) if !raw.trim().is_empty() => {
                // Model answers are held to the same length bound as the fallback.
                return fallback_meta_description(raw.trim().trim_matches('"'));
            }
            Ok(_) => fallbacks.push("meta description: empty answer".to_string()),
            Err(err) => fallbacks.push(format!("meta description: {err}")),
        }
        fallback_meta_description(text)
    }

    async fn schema_markup(
        &self,
        headline: &str,
        description: &str,
        text: &str,
        fallbacks: &mut Vec<String>,
    ) -> Value {
        let request = GenerationRequest::new(prompts::schema_markup(
            headline,
            description,
            char_prefix(text, self.budgets.schema_markup),
        ))
        .with_system(prompts::SCHEMA_MARKUP_SYSTEM);
        match self.gateway.json("schema_markup", request).await {
            Ok(value @ Value::Object(_)) => return value,
            Ok(_) => fallbacks.push("schema markup: not a JSON object".to_string()),
            Err(err) => fallbacks.push(format!("schema markup: {err}")),
        }
        fallback_schema_markup(headline, description, text, self.clock.now_local())
    }
}

#[async_trait]
impl Stage for SeoStage {
    type Input = SeoInput;
    type Output = SeoResult;

    fn name(&self) -> StageName {
        StageName::SeoOptimizer
    }

    async fn run(&self, input: &SeoInput) -> Result<Staged<SeoResult>, PipelineError> {
        let text = input.text.as_str();
        let mut fallbacks = Vec::new();

        let headline = self.headline(text, &mut fallbacks).await;
        let subheadings = self.subheadings(text, &mut fallbacks).await;
        let meta_description = self.meta_description(&headline, text, &mut fallbacks).await;
        let schema_markup = self
            .schema_markup(&headline, &meta_description, text, &mut fallbacks)
            .await;

        let density = keyword_density(text, input.raw_categories.first().map(String::as_str));
        let advice = recommendations(
            &headline,
            &subheadings,
            &meta_description,
            &schema_markup,
            &density,
        );
        info!(
            headline = %headline,
            density = density.density_percent,
            fallbacks = fallbacks.len(),
            "seo optimized"
        );

        Ok(Staged::with_reasons(
            SeoResult {
                optimized_text: input.text.clone(),
                headline,
                subheadings,
                meta_description,
                schema_markup,
                keyword_density: density,
                recommendations: advice,
            },
            fallbacks,
        ))
    }
}
