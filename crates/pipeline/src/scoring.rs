//! The composite quality score and the publication verdict.
//!
//! ```text
//! composite = 0.3 × coherence + 0.3 × (1 − risk) + 0.2 × narrative/10 + 0.2 × neutrality/10
//! ready     = verifier valid ∧ risk < 0.6 ∧ composite > 0.5
//! ```

use crate::{Rating, UnitScore};

/// Risk at or above which an article is never ready.
pub const MAX_READY_RISK: f64 = 0.6;
/// Composite score an article must exceed to be ready.
pub const MIN_READY_SCORE: f64 = 0.5;
/// Risk above which a warning is attached to the outcome.
pub const HIGH_RISK_WARNING: f64 = 0.7;

/// Combines the stage scores into one quality score in `[0, 1]`.
///
/// The weights are applied as integers over a common denominator so the
/// extremes come out as exactly 0.0 and 1.0.
pub fn composite_quality_score(
    coherence: UnitScore,
    risk: UnitScore,
    narrative: Rating,
    neutrality: Rating,
) -> UnitScore {
    let weighted = 3.0 * coherence.as_f64()
        + 3.0 * (1.0 - risk.as_f64())
        + 2.0 * narrative.normalized()
        + 2.0 * neutrality.normalized();
    UnitScore::clamped(weighted / 10.0)
}

/// Whether the article may be published.
pub fn ready_for_publication(verified: bool, risk: UnitScore, composite: UnitScore) -> bool {
    verified && risk.as_f64() < MAX_READY_RISK && composite.as_f64() > MIN_READY_SCORE
}
