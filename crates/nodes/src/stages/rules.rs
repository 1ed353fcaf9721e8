//! Stages that only apply local rules.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use pipeline::coherence::{CoherenceVerifier, VerificationResult};
use pipeline::fact_check::{FactCheckResult, FactChecker};
use pipeline::normalizer::{NormalizedText, NormalizerOptions, TextNormalizer};
use pipeline::planner::{PublicationPlan, PublicationPlanner};
use pipeline::taxonomy::{NormalizedTaxonomy, TaxonomyNormalizer};
use pipeline::{Clock, PipelineError, StageName};
use tracing::{debug, info};

use crate::stage::{Stage, Staged};

/// Stage 1: cleans the submitted article body.
#[derive(Debug, Clone, Default)]
pub struct NormalizerStage {
    normalizer: TextNormalizer,
}

impl NormalizerStage {
    pub fn new(options: NormalizerOptions) -> Self {
        Self {
            normalizer: TextNormalizer::new(options),
        }
    }
}

#[async_trait]
impl Stage for NormalizerStage {
    type Input = String;
    type Output = NormalizedText;

    fn name(&self) -> StageName {
        StageName::Normalizer
    }

    async fn run(&self, content: &String) -> Result<Staged<NormalizedText>, PipelineError> {
        Ok(Staged::completed(self.normalizer.normalize(content)))
    }
}

/// Stage 4: heuristic fact-check against the clock's current year.
pub struct FactCheckStage {
    checker: FactChecker,
    clock: Arc<dyn Clock>,
}

impl FactCheckStage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            checker: FactChecker::new(),
            clock,
        }
    }
}

#[async_trait]
impl Stage for FactCheckStage {
    type Input = String;
    type Output = FactCheckResult;

    fn name(&self) -> StageName {
        StageName::FactChecker
    }

    async fn run(&self, text: &String) -> Result<Staged<FactCheckResult>, PipelineError> {
        let result = self.checker.check(text, self.clock.now_local().year());
        info!(
            risk_score = result.risk_score.as_f64(),
            red_flags = result.red_flags.len(),
            citations = result.citation_count,
            "fact check complete"
        );
        Ok(Staged::completed(result))
    }
}

/// Stage 5: coherence, duplicate and contradiction checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoherenceStage {
    verifier: CoherenceVerifier,
}

impl CoherenceStage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Stage for CoherenceStage {
    type Input = String;
    type Output = VerificationResult;

    fn name(&self) -> StageName {
        StageName::CoherenceVerifier
    }

    async fn run(&self, text: &String) -> Result<Staged<VerificationResult>, PipelineError> {
        let result = self.verifier.verify(text);
        info!(
            coherence = result.coherence_score.as_f64(),
            contradiction = result.contradiction_detected,
            duplicates = result.duplicate_ideas.len(),
            valid = result.overall_valid,
            "verification complete"
        );
        Ok(Staged::completed(result))
    }
}

/// Raw categories and tags from the metadata stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyInput {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// Stage 8: canonical categories and tags.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyStage {
    normalizer: TaxonomyNormalizer,
}

impl TaxonomyStage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Stage for TaxonomyStage {
    type Input = TaxonomyInput;
    type Output = NormalizedTaxonomy;

    fn name(&self) -> StageName {
        StageName::TaxonomyNormalizer
    }

    async fn run(&self, input: &TaxonomyInput) -> Result<Staged<NormalizedTaxonomy>, PipelineError> {
        let result = self.normalizer.normalize(&input.categories, &input.tags);
        debug!(
            categories = ?result.categories,
            tags = ?result.tags,
            applied = result.applied_normalizations.len(),
            "taxonomy normalized"
        );
        Ok(Staged::completed(result))
    }
}

/// What the planner needs from upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerInput {
    pub text: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Already combined with the global auto-publish switch.
    pub auto_publish: bool,
}

/// Stage 9: publication date, channels, priority and reach.
pub struct PlannerStage {
    planner: PublicationPlanner,
    clock: Arc<dyn Clock>,
}

impl PlannerStage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            planner: PublicationPlanner::new(),
            clock,
        }
    }
}

#[async_trait]
impl Stage for PlannerStage {
    type Input = PlannerInput;
    type Output = PublicationPlan;

    fn name(&self) -> StageName {
        StageName::PublicationPlanner
    }

    async fn run(&self, input: &PlannerInput) -> Result<Staged<PublicationPlan>, PipelineError> {
        let plan = self.planner.plan(
            &input.text,
            &input.categories,
            &input.tags,
            input.auto_publish,
            self.clock.now_local(),
        );
        debug!(
            date = %plan.publication_date,
            time = %plan.publication_time,
            auto_publish = plan.auto_publish,
            "publication planned"
        );
        Ok(Staged::completed(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pipeline::FixedClock;

    fn clock(year: i32, hour: u32) -> Arc<dyn Clock> {
        let now = NaiveDate::from_ymd_opt(year, 3, 14)
            .and_then(|d| d.and_hms_opt(hour, 30, 0))
            .unwrap();
        Arc::new(FixedClock(now))
    }

    #[tokio::test]
    async fn fact_check_uses_clock_year() {
        let stage = FactCheckStage::new(clock(2020, 9));
        let text = "The treaty takes effect on March 3, 2022 according to [Reuters].".to_string();
        let staged = stage.run(&text).await.unwrap();
        assert!(staged.output.date_consistency.is_future_date);

        let stage = FactCheckStage::new(clock(2021, 9));
        let staged = stage.run(&text).await.unwrap();
        assert!(!staged.output.date_consistency.is_future_date);
    }

    #[tokio::test]
    async fn normalizer_reports_lengths() {
        let stage = NormalizerStage::new(NormalizerOptions::default());
        let staged = stage
            .run(&"<p>Hello   world</p><script>x()</script>".to_string())
            .await
            .unwrap();
        assert_eq!(staged.output.text, "Hello world");
        assert_eq!(staged.status(), pipeline::StageStatus::Completed);
    }

    #[tokio::test]
    async fn planner_passes_through_taxonomy_and_flag() {
        let stage = PlannerStage::new(clock(2024, 13));
        let input = PlannerInput {
            text: "Short piece about rain.".into(),
            categories: vec!["Weather".into()],
            tags: vec!["Rain".into()],
            auto_publish: true,
        };
        let plan = stage.run(&input).await.unwrap().output;
        assert_eq!(plan.final_categories, vec!["Weather"]);
        assert!(plan.auto_publish);
        assert_eq!(plan.publication_time.to_string(), "18:00:00");
    }
}
