//! Runs an article through the ten stages and records the outcome.
//!
//! # Failure boundary
//!
//! Each stage runs inside one guard that catches, in the same way:
//!
//! - an `Err` returned by the stage (an invariant broke),
//! - a panic inside the stage (caught with `catch_unwind`),
//! - cancellation of the caller's token (the stage future is dropped).
//!
//! Any of these stops the run. The outcome keeps the partial run state, has
//! `status = error`, and nothing is published. Expected failures never reach
//! the guard: stages absorb them and report `degraded`.
//!
//! Exactly one run-log record is written per run on every path; a failed write
//! is logged and otherwise ignored.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use pipeline::outcome::{FinalArticle, PipelineOutcome, RunState, StageReport};
use pipeline::planner::PublicationPlan;
use pipeline::scoring::{composite_quality_score, ready_for_publication, HIGH_RISK_WARNING};
use pipeline::settings::PipelineSettings;
use pipeline::{
    ArticleInput, Clock, PipelineError, PublishingTarget, RunId, RunLogRecord, RunLogSink,
    RunStatus, StageStatus, TextGenerator, Timestamp, UnitScore,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::autolearn::{AutolearnStage, Autolearner, LearnInput};
use crate::gateway::LlmGateway;
use crate::publish::AutoPublisher;
use crate::stage::Stage;
use crate::stages::{
    AuditStage, CoherenceStage, FactCheckStage, HumanizerStage, MetadataStage, NormalizerStage,
    PlannerInput, PlannerStage, SeoInput, SeoStage, TaxonomyInput, TaxonomyStage,
};

/// Ports the executor is assembled from.
pub struct PipelineDeps {
    pub generator: Arc<dyn TextGenerator>,
    pub autolearner: Arc<Autolearner>,
    pub run_log: Arc<dyn RunLogSink>,
    pub clock: Arc<dyn Clock>,
    /// `None` disables auto-publication regardless of settings.
    pub publisher: Option<Arc<dyn PublishingTarget>>,
}

/// Drives articles through the pipeline.
///
/// One executor serves any number of concurrent runs; stages of a single run
/// execute sequentially.
pub struct PipelineExecutor {
    settings: PipelineSettings,
    gateway: LlmGateway,
    normalizer: NormalizerStage,
    metadata: MetadataStage,
    audit: AuditStage,
    fact_check: FactCheckStage,
    coherence: CoherenceStage,
    humanizer: HumanizerStage,
    seo: SeoStage,
    taxonomy: TaxonomyStage,
    planner: PlannerStage,
    autolearn: AutolearnStage,
    publisher: Option<AutoPublisher>,
    run_log: Arc<dyn RunLogSink>,
}

/// What a completed run concluded.
struct Verdict {
    article: FinalArticle,
    quality_score: UnitScore,
    ready: bool,
    warnings: Vec<String>,
    plan: PublicationPlan,
}

impl PipelineExecutor {
    pub fn new(deps: PipelineDeps, settings: PipelineSettings) -> Self {
        let gateway = LlmGateway::new(deps.generator);
        let budgets = &settings.budgets;
        let cache_ttl = Duration::from_secs(settings.term_cache_ttl_secs);

        Self {
            normalizer: NormalizerStage::new(settings.normalizer.clone()),
            metadata: MetadataStage::new(gateway.clone(), budgets.metadata),
            audit: AuditStage::new(gateway.clone(), budgets.audit),
            fact_check: FactCheckStage::new(deps.clock.clone()),
            coherence: CoherenceStage::new(),
            humanizer: HumanizerStage::new(
                gateway.clone(),
                budgets.humanize,
                settings.humanizer_seed,
            ),
            seo: SeoStage::new(gateway.clone(), budgets.clone(), deps.clock.clone()),
            taxonomy: TaxonomyStage::new(),
            planner: PlannerStage::new(deps.clock),
            autolearn: AutolearnStage::new(deps.autolearner),
            publisher: deps
                .publisher
                .map(|target| AutoPublisher::new(target, cache_ttl)),
            run_log: deps.run_log,
            gateway,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Processes one article.
    ///
    /// Never fails: every problem is reported in the returned outcome. A fresh
    /// run ID is generated when `run_id` is `None`.
    pub async fn run(
        &self,
        input: &ArticleInput,
        run_id: Option<RunId>,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        let run_id = run_id.unwrap_or_else(RunId::new_random);
        let span = info_span!("pipeline_run", %run_id);
        self.run_instrumented(input, run_id, cancel)
            .instrument(span)
            .await
    }

    async fn run_instrumented(
        &self,
        input: &ArticleInput,
        run_id: RunId,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        let started = Instant::now();
        info!(
            title = input.title(),
            chars = input.content().chars().count(),
            auto_publish = input.auto_publish(),
            "pipeline run started"
        );

        let mut state = RunState::default();
        let mut stages = Vec::with_capacity(10);
        let result = self.execute(input, &mut state, &mut stages, cancel).await;

        let mut outcome = match result {
            Ok(verdict) => PipelineOutcome {
                run_id,
                status: RunStatus::Success,
                article: Some(verdict.article),
                quality_score: Some(verdict.quality_score),
                ready_for_publication: verdict.ready,
                warnings: verdict.warnings,
                stages,
                plan: Some(verdict.plan),
                published_post: None,
                execution_time_ms: 0.0,
                error: None,
                state,
            },
            Err(err) => {
                error!(error = %err, "pipeline run aborted");
                PipelineOutcome {
                    run_id,
                    status: RunStatus::Error,
                    article: None,
                    quality_score: None,
                    ready_for_publication: false,
                    warnings: Vec::new(),
                    stages,
                    plan: None,
                    published_post: None,
                    execution_time_ms: 0.0,
                    error: Some(err.to_string()),
                    state,
                }
            }
        };

        if outcome.is_success() {
            self.auto_publish(&mut outcome, cancel).await;
        }

        outcome.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            status = ?outcome.status,
            quality_score = outcome.quality_score.map(UnitScore::as_f64),
            ready = outcome.ready_for_publication,
            elapsed_ms = outcome.execution_time_ms,
            "pipeline run finished"
        );

        self.record(input, &outcome).await;
        outcome
    }

    async fn execute(
        &self,
        input: &ArticleInput,
        state: &mut RunState,
        reports: &mut Vec<StageReport>,
        cancel: &CancellationToken,
    ) -> Result<Verdict, PipelineError> {
        let content = input.content().to_string();
        let cleaned = guarded(&self.normalizer, &content, reports, cancel).await?;
        state.cleaned_text.set("cleaned_text", cleaned)?;
        let text = state.cleaned_text.require("cleaned_text")?.text.clone();

        let metadata = guarded(&self.metadata, &text, reports, cancel).await?;
        state.metadata.set("metadata", metadata)?;

        let audit = guarded(&self.audit, &text, reports, cancel).await?;
        state.audit.set("audit", audit)?;

        let fact_check = guarded(&self.fact_check, &text, reports, cancel).await?;
        state.fact_check.set("fact_check", fact_check)?;

        let verification = guarded(&self.coherence, &text, reports, cancel).await?;
        state.verification.set("verification", verification)?;

        let humanized = guarded(&self.humanizer, &text, reports, cancel).await?;
        state.humanized.set("humanized", humanized)?;
        let humanized_text = state.humanized.require("humanized")?.text.clone();

        let metadata = state.metadata.require("metadata")?;
        let seo_input = SeoInput {
            text: humanized_text.clone(),
            raw_categories: metadata.categories.clone(),
        };
        let taxonomy_input = TaxonomyInput {
            categories: metadata.categories.clone(),
            tags: metadata.tags.clone(),
        };

        let seo = guarded(&self.seo, &seo_input, reports, cancel).await?;
        state.seo.set("seo", seo)?;

        let taxonomy = guarded(&self.taxonomy, &taxonomy_input, reports, cancel).await?;
        state.taxonomy.set("taxonomy", taxonomy)?;

        let taxonomy = state.taxonomy.require("taxonomy")?;
        let planner_input = PlannerInput {
            text: humanized_text,
            categories: taxonomy.categories.clone(),
            tags: taxonomy.tags.clone(),
            auto_publish: input.auto_publish() && self.settings.auto_publish_enabled,
        };
        let learn_input = LearnInput {
            categories: taxonomy.categories.clone(),
            tags: taxonomy.tags.clone(),
            traffic_score: 1.0 - state.fact_check.require("fact_check")?.risk_score.as_f64(),
        };

        let plan = guarded(&self.planner, &planner_input, reports, cancel).await?;
        state.plan.set("plan", plan)?;

        let learned = guarded(&self.autolearn, &learn_input, reports, cancel).await?;
        state.learned.set("learned", learned)?;

        verdict(state)
    }

    /// Publishes a ready article when the run asked for it and a target is
    /// configured. Failure becomes a warning.
    async fn auto_publish(&self, outcome: &mut PipelineOutcome, cancel: &CancellationToken) {
        let wanted = outcome.plan.as_ref().is_some_and(|plan| plan.auto_publish);
        let (Some(publisher), Some(article)) = (&self.publisher, &outcome.article) else {
            return;
        };
        if !wanted || !outcome.ready_for_publication {
            return;
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                outcome.warnings.push("Auto-publication skipped: run cancelled".to_string());
                return;
            }
            result = publisher.publish(article) => result,
        };
        match result {
            Ok(post_id) => outcome.published_post = Some(post_id),
            Err(err) => {
                warn!(error = %err, "auto-publication failed");
                outcome.warnings.push(format!("Auto-publication failed: {err}"));
            }
        }
    }

    async fn record(&self, input: &ArticleInput, outcome: &PipelineOutcome) {
        let record = RunLogRecord {
            run_id: outcome.run_id,
            input_excerpt: input.excerpt(self.settings.log_excerpt_chars),
            output_summary: outcome.summary(),
            status: outcome.status,
            execution_time_ms: outcome.execution_time_ms,
            model: Some(self.gateway.model_name()),
            error: outcome.error.clone(),
            recorded_at: Timestamp::now(),
        };
        if let Err(err) = self.run_log.record(&record).await {
            warn!(error = %err, "failed to record run outcome");
        }
    }
}

/// Runs one stage inside the failure boundary and appends its report.
async fn guarded<S: Stage>(
    stage: &S,
    input: &S::Input,
    reports: &mut Vec<StageReport>,
    cancel: &CancellationToken,
) -> Result<S::Output, PipelineError> {
    let name = stage.name();
    async move {
        let started = Instant::now();
        let result = if cancel.is_cancelled() {
            Err(PipelineError::Cancelled { stage: name })
        } else {
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(PipelineError::Cancelled { stage: name }),
                caught = AssertUnwindSafe(stage.run(input)).catch_unwind() => {
                    caught.unwrap_or_else(|payload| {
                        Err(PipelineError::StagePanicked {
                            stage: name,
                            message: panic_message(payload.as_ref()),
                        })
                    })
                }
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(staged) => {
                let status = staged.status();
                match staged.degradation.as_deref() {
                    Some(reason) => warn!(elapsed_ms, reason, "stage degraded"),
                    None => info!(elapsed_ms, "stage completed"),
                }
                reports.push(StageReport {
                    stage: name,
                    status,
                    elapsed_ms,
                    detail: staged.degradation,
                });
                Ok(staged.output)
            }
            Err(err) => {
                error!(elapsed_ms, error = %err, "stage failed");
                reports.push(StageReport {
                    stage: name,
                    status: StageStatus::Failed,
                    elapsed_ms,
                    detail: Some(err.to_string()),
                });
                Err(err)
            }
        }
    }
    .instrument(info_span!("stage", stage = %name))
    .await
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn verdict(state: &RunState) -> Result<Verdict, PipelineError> {
    let audit = state.audit.require("audit")?;
    let fact_check = state.fact_check.require("fact_check")?;
    let verification = state.verification.require("verification")?;
    let seo = state.seo.require("seo")?;
    let taxonomy = state.taxonomy.require("taxonomy")?;
    let plan = state.plan.require("plan")?;

    let risk = fact_check.risk_score;
    let quality_score = composite_quality_score(
        verification.coherence_score,
        risk,
        audit.narrative_quality.score,
        audit.neutrality.score,
    );
    let ready = ready_for_publication(verification.overall_valid, risk, quality_score);

    let mut warnings = Vec::new();
    if risk.as_f64() > HIGH_RISK_WARNING {
        warnings.push(format!("High fact-check risk: {risk}"));
    }
    if !verification.overall_valid {
        warnings.push("Content failed verification checks".to_string());
    }

    Ok(Verdict {
        article: FinalArticle {
            headline: seo.headline.clone(),
            content: seo.optimized_text.clone(),
            meta_description: seo.meta_description.clone(),
            schema_markup: seo.schema_markup.clone(),
            categories: taxonomy.categories.clone(),
            tags: taxonomy.tags.clone(),
        },
        quality_score,
        ready,
        warnings,
        plan: plan.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(from_str.as_ref()), "boom");
        assert_eq!(panic_message(from_string.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn verdict_requires_every_upstream_field() {
        let err = verdict(&RunState::default()).err().unwrap();
        assert_eq!(
            err,
            PipelineError::StateMissing {
                field: "audit".into()
            }
        );
    }
}
