//! Run state threaded between stages, and the outcome of a run.

use serde::Serialize;
use serde_json::{json, Value};

use crate::coherence::VerificationResult;
use crate::fact_check::FactCheckResult;
use crate::normalizer::NormalizedText;
use crate::planner::PublicationPlan;
use crate::ports::RunStatus;
use crate::results::{AuditResult, HumanizedText, MetadataResult};
use crate::seo::SeoResult;
use crate::taxonomy::NormalizedTaxonomy;
use crate::{PipelineError, PostId, RunId, StageName, StageStatus, UnitScore};

/// A value that can be written once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Slot<T>(Option<T>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Slot<T> {
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Stores `value`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateAlreadyWritten`] if the slot already holds a value.
    pub fn set(&mut self, field: &str, value: T) -> Result<(), PipelineError> {
        if self.0.is_some() {
            return Err(PipelineError::StateAlreadyWritten {
                field: field.to_string(),
            });
        }
        self.0 = Some(value);
        Ok(())
    }

    /// Returns the value.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateMissing`] if nothing was written yet.
    pub fn require(&self, field: &str) -> Result<&T, PipelineError> {
        self.0.as_ref().ok_or_else(|| PipelineError::StateMissing {
            field: field.to_string(),
        })
    }
}

macro_rules! run_state {
    ($( $(#[$doc:meta])* $field:ident : $ty:ty ),+ $(,)?) => {
        /// Stage outputs of one run, each written once by its owning stage.
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct RunState {
            $( $(#[$doc])* pub $field: Slot<$ty>, )+
        }

        impl RunState {
            /// Names of the fields written so far, in stage order.
            pub fn written_fields(&self) -> Vec<&'static str> {
                let mut fields = Vec::new();
                $( if self.$field.is_set() { fields.push(stringify!($field)); } )+
                fields
            }
        }
    };
}

run_state! {
    cleaned_text: NormalizedText,
    metadata: MetadataResult,
    audit: AuditResult,
    fact_check: FactCheckResult,
    verification: VerificationResult,
    humanized: HumanizedText,
    seo: SeoResult,
    taxonomy: NormalizedTaxonomy,
    plan: PublicationPlan,
    /// Set once the taxonomy learning update has been handed off.
    learned: bool,
}

/// How one stage of a run went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: StageName,
    pub status: StageStatus,
    pub elapsed_ms: f64,
    /// Why the stage degraded or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The publication-ready article assembled from a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalArticle {
    pub headline: String,
    pub content: String,
    pub meta_description: String,
    pub schema_markup: Value,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// Everything a run produced.
///
/// On the error path `article`, `quality_score` and `plan` are absent and the
/// partial `state` holds whatever the stages wrote before the failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    pub article: Option<FinalArticle>,
    pub quality_score: Option<UnitScore>,
    pub ready_for_publication: bool,
    pub warnings: Vec<String>,
    pub stages: Vec<StageReport>,
    pub plan: Option<PublicationPlan>,
    pub published_post: Option<PostId>,
    pub execution_time_ms: f64,
    pub error: Option<String>,
    pub state: RunState,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Status of `stage`, or `None` if it never ran.
    pub fn stage_status(&self, stage: StageName) -> Option<StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.status)
    }

    /// Compact summary stored in the run log.
    pub fn summary(&self) -> Value {
        let stages: serde_json::Map<String, Value> = self
            .stages
            .iter()
            .map(|r| (r.stage.to_string(), json!(r.status)))
            .collect();
        json!({
            "headline": self.article.as_ref().map(|a| a.headline.as_str()),
            "quality_score": self.quality_score.map(UnitScore::as_f64),
            "ready_for_publication": self.ready_for_publication,
            "risk_score": self.state.fact_check.get().map(|f| f.risk_score.as_f64()),
            "warnings": self.warnings,
            "stages": stages,
            "published_post": self.published_post.map(PostId::as_u64),
        })
    }
}
