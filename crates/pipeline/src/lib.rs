//! Core domain for the editorial pipeline.
//!
//! This crate contains the article and stage-result types, the rule engines
//! behind the deterministic stages, the scoring rules, and the port traits
//! the infrastructure crates implement. It performs no I/O.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RunId`, `PostId`, `TermId`, `ModelName`) |
//! | [`types`] | Shared value types (`UnitScore`, `Rating`, `StageName`, `Timestamp`) |
//! | [`errors`] | Error enums and `RetryPolicy` |
//! | [`article`] | Validated article input |
//! | [`ports`] | Generative text, run log, profile store, publishing target, clock |
//! | [`results`] | Generative-stage results and their degraded variants |
//! | [`normalizer`] | Text cleaning |
//! | [`fact_check`] | Heuristic fact-checking |
//! | [`coherence`] | Coherence verification |
//! | [`humanize`] | Local humanizing rewrites |
//! | [`seo`] | SEO results and local fallbacks |
//! | [`taxonomy`] | Category/tag normalization and the term-ID cache |
//! | [`planner`] | Publication planning |
//! | [`profile`] | Taxonomy learning profile |
//! | [`scoring`] | Composite score and publication verdict |
//! | [`outcome`] | Write-once run state and run outcome |
//! | [`settings`] | Pipeline tunables |

pub mod article;
pub mod coherence;
pub mod errors;
pub mod fact_check;
pub mod humanize;
pub mod identifiers;
pub mod normalizer;
pub mod outcome;
pub mod planner;
pub mod ports;
pub mod profile;
pub mod results;
pub mod scoring;
pub mod seo;
pub mod settings;
pub mod taxonomy;
pub mod types;

// Re-export the types shared across crates at the crate root.
pub use article::{ArticleInput, ArticleSubmission};
pub use errors::{GenerationError, PipelineError, PublishError, RetryPolicy, StoreError};
pub use identifiers::{ModelName, PostId, RunId, TermId};
pub use ports::{
    Clock, FixedClock, GenerationRequest, PostDraft, PostStatus, ProfileStore, PublishingTarget,
    RunLogRecord, RunLogSink, RunStatus, SystemClock, TextGenerator,
};
pub use profile::TaxonomyProfile;
pub use types::{Rating, StageName, StageStatus, Timestamp, UnitScore};
