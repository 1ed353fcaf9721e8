//! End-to-end runs of the executor against in-memory ports.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use nodes::{Autolearner, PipelineDeps, PipelineExecutor};
use pipeline::settings::{AutolearnSettings, PipelineSettings};
use pipeline::{
    ArticleInput, FixedClock, GenerationError, GenerationRequest, ModelName, PipelineError,
    PostDraft, PostId, ProfileStore, PublishError, PublishingTarget, RunLogRecord, RunLogSink,
    RunStatus, StageName, StageStatus, StoreError, TaxonomyProfile, TermId, TextGenerator,
};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Answers each model call the way a cooperative model would, routed on the
/// system framing of the request.
struct CooperativeModel;

#[async_trait]
impl TextGenerator for CooperativeModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let system = request.system_prompt.as_deref().unwrap_or_default();
        let reply = if request.json_mode && system.contains("suggested_categories") {
            r#"{"suggested_categories": ["Politics", "Economy"],
                "suggested_tags": ["budget", "Transit", "Budget"],
                "entities": [{"name": "City Council", "type": "organization"}],
                "tone": "neutral"}"#
        } else if request.json_mode && system.contains("neutrality_score") {
            r#"{"narrative_quality": {"score": 8, "reason": "clear"},
                "preliminary_factuality": {"score": 8, "reason": "sourced"},
                "aggressiveness_level": {"score": 1, "reason": "calm"},
                "neutrality_score": {"score": 9, "reason": "balanced"},
                "improvements_suggested": []}"#
        } else if request.json_mode {
            r#"{"@context": "https://schema.org", "@type": "NewsArticle", "headline": "Council passes budget"}"#
        } else if system.contains("search-result") {
            "The city council approved the annual budget, with new money for transit and longer library hours across the north district."
        } else if system.contains("subheadings") {
            r#"["What passed", "Who benefits"]"#
        } else if system.contains("headline") {
            "Council passes budget"
        } else {
            "The city council approved the annual budget on Tuesday."
        };
        Ok(reply.to_string())
    }

    fn model_name(&self) -> ModelName {
        ModelName::new("cooperative").unwrap()
    }
}

struct DownModel;

#[async_trait]
impl TextGenerator for DownModel {
    async fn generate(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Transient {
            message: "connection refused".into(),
        })
    }

    fn model_name(&self) -> ModelName {
        ModelName::new("down").unwrap()
    }
}

struct HangingModel;

#[async_trait]
impl TextGenerator for HangingModel {
    async fn generate(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
        futures::future::pending().await
    }

    fn model_name(&self) -> ModelName {
        ModelName::new("hanging").unwrap()
    }
}

struct PanickingModel;

#[async_trait]
impl TextGenerator for PanickingModel {
    async fn generate(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
        panic!("model adapter bug")
    }

    fn model_name(&self) -> ModelName {
        ModelName::new("panicking").unwrap()
    }
}

#[derive(Default)]
struct MemoryProfiles {
    profile: Mutex<Option<TaxonomyProfile>>,
}

#[async_trait]
impl ProfileStore for MemoryProfiles {
    async fn load(&self) -> Result<Option<TaxonomyProfile>, StoreError> {
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn save(&self, profile: &TaxonomyProfile) -> Result<(), StoreError> {
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryRunLog {
    records: Mutex<Vec<RunLogRecord>>,
}

#[async_trait]
impl RunLogSink for MemoryRunLog {
    async fn record(&self, record: &RunLogRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct BrokenRunLog;

#[async_trait]
impl RunLogSink for BrokenRunLog {
    async fn record(&self, _: &RunLogRecord) -> Result<(), StoreError> {
        Err(StoreError::Io {
            location: "runs.jsonl".into(),
            message: "disk full".into(),
        })
    }
}

#[derive(Default)]
struct MemoryTarget {
    posts: Mutex<Vec<PostDraft>>,
    reject: bool,
}

#[async_trait]
impl PublishingTarget for MemoryTarget {
    async fn ensure_category(&self, _: &str) -> Result<TermId, PublishError> {
        Ok(TermId::new(3))
    }

    async fn ensure_tag(&self, _: &str) -> Result<TermId, PublishError> {
        Ok(TermId::new(5))
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<PostId, PublishError> {
        if self.reject {
            return Err(PublishError::Rejected {
                status: 403,
                message: "insufficient permissions".into(),
            });
        }
        self.posts.lock().unwrap().push(draft.clone());
        Ok(PostId::new(42))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const BODY: &str = "The city council approved the annual budget on Tuesday after a long \
public session [City Budget Office]. However, several members asked for more funding for \
public transit. Furthermore, the mayor's office published a summary of the spending plan \
for residents. Meanwhile, community groups welcomed the new library hours in the north district.";

struct Harness {
    executor: PipelineExecutor,
    profiles: Arc<MemoryProfiles>,
    run_log: Arc<MemoryRunLog>,
}

fn harness_with(
    generator: Arc<dyn TextGenerator>,
    publisher: Option<Arc<dyn PublishingTarget>>,
    settings: PipelineSettings,
) -> Harness {
    let profiles = Arc::new(MemoryProfiles::default());
    let run_log = Arc::new(MemoryRunLog::default());
    let now = NaiveDate::from_ymd_opt(2024, 3, 14)
        .and_then(|d| d.and_hms_opt(10, 30, 0))
        .unwrap();
    let executor = PipelineExecutor::new(
        PipelineDeps {
            generator,
            autolearner: Arc::new(Autolearner::new(
                profiles.clone(),
                AutolearnSettings::default(),
            )),
            run_log: run_log.clone(),
            clock: Arc::new(FixedClock(now)),
            publisher,
        },
        settings,
    );
    Harness {
        executor,
        profiles,
        run_log,
    }
}

fn harness(generator: Arc<dyn TextGenerator>) -> Harness {
    harness_with(generator, None, seeded_settings())
}

fn seeded_settings() -> PipelineSettings {
    PipelineSettings {
        humanizer_seed: Some(11),
        ..PipelineSettings::default()
    }
}

fn article(auto_publish: bool) -> ArticleInput {
    ArticleInput::new("Council passes budget", BODY, None, auto_publish).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn well_sourced_article_is_ready_for_publication() {
    let h = harness(Arc::new(CooperativeModel));
    let outcome = h
        .executor
        .run(&article(false), None, &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, RunStatus::Success, "{:?}", outcome.error);
    let risk = outcome.state.fact_check.get().unwrap().risk_score.as_f64();
    assert!(risk < 0.3, "risk {risk}");
    assert!(outcome.state.verification.get().unwrap().overall_valid);
    assert!(outcome.ready_for_publication);
    assert!(outcome.quality_score.unwrap().as_f64() > 0.9);
    assert!(outcome.warnings.is_empty());

    for stage in StageName::ALL {
        assert_eq!(outcome.stage_status(stage), Some(StageStatus::Completed), "{stage}");
    }

    let article = outcome.article.as_ref().unwrap();
    assert_eq!(article.headline, "Council passes budget");
    assert_eq!(article.categories, vec!["Politica", "Economia"]);
    assert_eq!(article.tags, vec!["Budget", "Transit"]);
    assert_eq!(article.schema_markup["@type"], "NewsArticle");
    assert_eq!(
        outcome.state.written_fields(),
        vec![
            "cleaned_text",
            "metadata",
            "audit",
            "fact_check",
            "verification",
            "humanized",
            "seo",
            "taxonomy",
            "plan",
            "learned"
        ]
    );
    assert_eq!(outcome.published_post, None);
}

#[tokio::test]
async fn model_outage_degrades_but_still_succeeds() {
    let h = harness(Arc::new(DownModel));
    let outcome = h
        .executor
        .run(&article(false), None, &CancellationToken::new())
        .await;

    assert!(outcome.is_success());
    for stage in [
        StageName::MetadataExtractor,
        StageName::QualityAuditor,
        StageName::Humanizer,
        StageName::SeoOptimizer,
    ] {
        assert_eq!(outcome.stage_status(stage), Some(StageStatus::Degraded), "{stage}");
    }
    assert_eq!(
        outcome.stage_status(StageName::FactChecker),
        Some(StageStatus::Completed)
    );

    let article = outcome.article.unwrap();
    assert_eq!(
        article.headline,
        "The city council approved the annual budget on Tuesday after"
    );
    assert!(article.categories.is_empty());
    assert_eq!(article.schema_markup["@type"], "NewsArticle");
    assert!(article.meta_description.chars().count() <= 160);

    let records = h.run_log.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RunStatus::Success);
    assert_eq!(records[0].model.as_ref().map(ModelName::as_str), Some("down"));
}

#[tokio::test]
async fn taxonomy_is_learned_with_inverse_risk() {
    let h = harness(Arc::new(CooperativeModel));
    h.executor
        .run(&article(false), None, &CancellationToken::new())
        .await;

    let profile = h.profiles.profile.lock().unwrap().clone().unwrap();
    assert_eq!(profile.statistics.total_articles, 1);
    assert_eq!(profile.categories["politica"].count, 1);
    assert!((profile.categories["politica"].traffic_total - 1.0).abs() < 1e-9);
    assert_eq!(profile.associations["economia"]["transit"], 1.0);
}

#[tokio::test]
async fn cancelled_before_start_records_an_error() {
    let h = harness(Arc::new(CooperativeModel));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = h.executor.run(&article(false), None, &cancel).await;

    assert_eq!(outcome.status, RunStatus::Error);
    assert_eq!(
        outcome.error.as_deref(),
        Some(
            PipelineError::Cancelled {
                stage: StageName::Normalizer
            }
            .to_string()
            .as_str()
        )
    );
    assert_eq!(
        outcome.stage_status(StageName::Normalizer),
        Some(StageStatus::Failed)
    );
    assert!(outcome.article.is_none());
    assert_eq!(h.run_log.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancellation_drops_the_in_flight_stage() {
    let h = harness(Arc::new(HangingModel));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        h.executor.run(&article(false), None, &cancel),
    )
    .await
    .expect("cancellation should end the run");

    assert_eq!(outcome.status, RunStatus::Error);
    assert!(outcome.state.cleaned_text.is_set());
    assert!(!outcome.state.metadata.is_set());
    assert_eq!(
        outcome.stage_status(StageName::MetadataExtractor),
        Some(StageStatus::Failed)
    );
    assert_eq!(outcome.stage_status(StageName::QualityAuditor), None);

    let records = h.run_log.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RunStatus::Error);
}

#[tokio::test]
async fn panicking_stage_becomes_an_error_outcome() {
    let h = harness(Arc::new(PanickingModel));
    let outcome = h
        .executor
        .run(&article(true), None, &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, RunStatus::Error);
    let error = outcome.error.unwrap();
    assert!(error.contains("panicked"), "{error}");
    assert!(error.contains("model adapter bug"), "{error}");
    assert!(outcome.plan.is_none());
    assert!(outcome.published_post.is_none());
    assert_eq!(h.run_log.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn supplied_run_id_is_kept() {
    let h = harness(Arc::new(CooperativeModel));
    let run_id = pipeline::RunId::new_random();
    let outcome = h
        .executor
        .run(&article(false), Some(run_id), &CancellationToken::new())
        .await;
    assert_eq!(outcome.run_id, run_id);
    assert_eq!(h.run_log.records.lock().unwrap()[0].run_id, run_id);
}

#[tokio::test]
async fn run_log_failure_does_not_fail_the_run() {
    let profiles = Arc::new(MemoryProfiles::default());
    let executor = PipelineExecutor::new(
        PipelineDeps {
            generator: Arc::new(CooperativeModel),
            autolearner: Arc::new(Autolearner::new(profiles, AutolearnSettings::default())),
            run_log: Arc::new(BrokenRunLog),
            clock: Arc::new(FixedClock(
                NaiveDate::from_ymd_opt(2024, 3, 14)
                    .and_then(|d| d.and_hms_opt(9, 0, 0))
                    .unwrap(),
            )),
            publisher: None,
        },
        seeded_settings(),
    );
    let outcome = executor
        .run(&article(false), None, &CancellationToken::new())
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn ready_article_is_auto_published_when_enabled() {
    let target = Arc::new(MemoryTarget::default());
    let settings = PipelineSettings {
        auto_publish_enabled: true,
        ..seeded_settings()
    };
    let h = harness_with(
        Arc::new(CooperativeModel),
        Some(target.clone() as Arc<dyn PublishingTarget>),
        settings,
    );

    let outcome = h
        .executor
        .run(&article(true), None, &CancellationToken::new())
        .await;

    assert!(outcome.plan.as_ref().unwrap().auto_publish);
    assert_eq!(outcome.published_post, Some(PostId::new(42)));
    let posts = target.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Council passes budget");
    assert_eq!(posts[0].category_refs, vec![TermId::new(3), TermId::new(3)]);
    assert_eq!(posts[0].tag_refs, vec![TermId::new(5), TermId::new(5)]);
}

#[tokio::test]
async fn auto_publish_needs_the_global_switch() {
    let target = Arc::new(MemoryTarget::default());
    let h = harness_with(
        Arc::new(CooperativeModel),
        Some(target.clone() as Arc<dyn PublishingTarget>),
        seeded_settings(),
    );

    let outcome = h
        .executor
        .run(&article(true), None, &CancellationToken::new())
        .await;

    assert!(!outcome.plan.unwrap().auto_publish);
    assert!(outcome.published_post.is_none());
    assert!(target.posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn publish_failure_is_a_warning() {
    let target = Arc::new(MemoryTarget {
        reject: true,
        ..MemoryTarget::default()
    });
    let settings = PipelineSettings {
        auto_publish_enabled: true,
        ..seeded_settings()
    };
    let h = harness_with(
        Arc::new(CooperativeModel),
        Some(target as Arc<dyn PublishingTarget>),
        settings,
    );

    let outcome = h
        .executor
        .run(&article(true), None, &CancellationToken::new())
        .await;

    assert!(outcome.is_success());
    assert!(outcome.published_post.is_none());
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.starts_with("Auto-publication failed")));
}
