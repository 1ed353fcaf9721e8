//! The contract every pipeline stage implements.

use async_trait::async_trait;
use pipeline::{PipelineError, StageName, StageStatus};

/// A stage output, plus the reason the stage fell back if it did.
#[derive(Debug, Clone, PartialEq)]
pub struct Staged<T> {
    pub output: T,
    pub degradation: Option<String>,
}

impl<T> Staged<T> {
    /// The stage produced its primary result.
    pub fn completed(output: T) -> Self {
        Self {
            output,
            degradation: None,
        }
    }

    /// The stage substituted (part of) its degraded result.
    pub fn degraded(output: T, reason: impl Into<String>) -> Self {
        Self {
            output,
            degradation: Some(reason.into()),
        }
    }

    /// Marks the output degraded when any of `reasons` were collected.
    pub fn with_reasons(output: T, reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            Self::completed(output)
        } else {
            Self::degraded(output, reasons.join("; "))
        }
    }

    pub fn status(&self) -> StageStatus {
        if self.degradation.is_some() {
            StageStatus::Degraded
        } else {
            StageStatus::Completed
        }
    }
}

/// One step of the pipeline.
///
/// `run` absorbs every expected failure (model errors, malformed answers,
/// store errors) and returns a degraded [`Staged`] instead. An `Err` is
/// reserved for broken invariants and aborts the run.
#[async_trait]
pub trait Stage: Send + Sync {
    /// The upstream data this stage reads.
    type Input: Send + Sync;
    /// The run-state field this stage writes.
    type Output: Send;

    fn name(&self) -> StageName;

    async fn run(&self, input: &Self::Input) -> Result<Staged<Self::Output>, PipelineError>;
}
