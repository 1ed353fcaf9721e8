//! Shared value types for the editorial pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (scores are in `[0.0, 1.0]`, ratings in
//! `[0.0, 10.0]`) and participate in domain computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Score types
// ---------------------------------------------------------------------------

/// A score in the range `[0.0, 1.0]`.
///
/// Used for fact-check risk, verifier coherence, and the composite quality
/// score.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct UnitScore(f64);

impl UnitScore {
    /// The lowest possible score.
    pub const ZERO: UnitScore = UnitScore(0.0);

    /// The highest possible score.
    pub const ONE: UnitScore = UnitScore(1.0);

    /// Creates a [`UnitScore`], returning `None` if `value` is outside
    /// the valid range `[0.0, 1.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a [`UnitScore`] by clamping `value` into `[0.0, 1.0]`.
    ///
    /// NaN maps to `0.0`.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Returns the score as an `f64` in `[0.0, 1.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for UnitScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// An editorial rating on the `[0.0, 10.0]` scale used by the quality auditor.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rating(f64);

impl Rating {
    /// Midpoint of the scale; the rating used when an audit could not be made.
    pub const MIDPOINT: Rating = Rating(5.0);

    /// Creates a [`Rating`] by clamping `value` into `[0.0, 10.0]`.
    ///
    /// NaN maps to the midpoint.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self::MIDPOINT
        } else {
            Self(value.clamp(0.0, 10.0))
        }
    }

    /// Returns the raw rating in `[0.0, 10.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns the rating rescaled to `[0.0, 1.0]`.
    pub fn normalized(self) -> f64 {
        self.0 / 10.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}/10", self.0)
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The ten pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Normalizer,
    MetadataExtractor,
    QualityAuditor,
    FactChecker,
    CoherenceVerifier,
    Humanizer,
    SeoOptimizer,
    TaxonomyNormalizer,
    PublicationPlanner,
    TaxonomyAutolearner,
}

impl StageName {
    /// All stages in the order the orchestrator runs them.
    pub const ALL: [StageName; 10] = [
        StageName::Normalizer,
        StageName::MetadataExtractor,
        StageName::QualityAuditor,
        StageName::FactChecker,
        StageName::CoherenceVerifier,
        StageName::Humanizer,
        StageName::SeoOptimizer,
        StageName::TaxonomyNormalizer,
        StageName::PublicationPlanner,
        StageName::TaxonomyAutolearner,
    ];

    /// Stable snake_case label used in logs and serialized status maps.
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Normalizer => "normalizer",
            StageName::MetadataExtractor => "metadata_extractor",
            StageName::QualityAuditor => "quality_auditor",
            StageName::FactChecker => "fact_checker",
            StageName::CoherenceVerifier => "coherence_verifier",
            StageName::Humanizer => "humanizer",
            StageName::SeoOptimizer => "seo_optimizer",
            StageName::TaxonomyNormalizer => "taxonomy_normalizer",
            StageName::PublicationPlanner => "publication_planner",
            StageName::TaxonomyAutolearner => "taxonomy_autolearner",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// How a stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage produced its primary result.
    Completed,
    /// The stage fell back to (part of) its degraded result.
    Degraded,
    /// The stage raised an unexpected error and the run was aborted.
    Failed,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_score_rejects_out_of_range_values() {
        assert!(UnitScore::new(1.2).is_none());
        assert!(UnitScore::new(-0.1).is_none());
        assert!(UnitScore::new(f64::NAN).is_none());
        assert_eq!(UnitScore::new(0.4).map(UnitScore::as_f64), Some(0.4));
    }

    #[test]
    fn clamping_keeps_scores_in_range() {
        assert_eq!(UnitScore::clamped(1.7), UnitScore::ONE);
        assert_eq!(UnitScore::clamped(-3.0), UnitScore::ZERO);
        assert_eq!(Rating::clamped(14.0).as_f64(), 10.0);
        assert_eq!(Rating::clamped(f64::NAN), Rating::MIDPOINT);
    }

    #[test]
    fn stage_labels_are_snake_case() {
        assert_eq!(StageName::SeoOptimizer.to_string(), "seo_optimizer");
        assert_eq!(
            serde_json::to_string(&StageName::FactChecker).unwrap(),
            "\"fact_checker\""
        );
    }
}
