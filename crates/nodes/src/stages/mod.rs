//! One [`Stage`](crate::Stage) implementation per pipeline step.
//!
//! | Stage | Type | Backed by |
//! |-------|------|-----------|
//! | 1 | [`NormalizerStage`] | rules |
//! | 2 | [`MetadataStage`] | model, JSON |
//! | 3 | [`AuditStage`] | model, JSON |
//! | 4 | [`FactCheckStage`] | rules + clock |
//! | 5 | [`CoherenceStage`] | rules |
//! | 6 | [`HumanizerStage`] | rules + model |
//! | 7 | [`SeoStage`] | model (four calls) + rules |
//! | 8 | [`TaxonomyStage`] | rules |
//! | 9 | [`PlannerStage`] | rules + clock |
//! | 10 | [`AutolearnStage`](crate::autolearn::AutolearnStage) | profile store |

mod analysis;
mod humanize;
mod rules;
mod seo;

pub use analysis::{AuditStage, MetadataStage};
pub use humanize::HumanizerStage;
pub use rules::{
    CoherenceStage, FactCheckStage, NormalizerStage, PlannerInput, PlannerStage, TaxonomyInput,
    TaxonomyStage,
};
pub use seo::{SeoInput, SeoStage};
