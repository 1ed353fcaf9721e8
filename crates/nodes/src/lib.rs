//! Stage implementations, the LLM gateway and the run orchestrator.
//!
//! This crate wires the rule engines and result types of the [`pipeline`]
//! crate to the ports (generative text, profile store, run log, publishing
//! target, clock) and drives a submitted article through the ten stages.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between the domain rules in
//! [`pipeline`] and the infrastructure traits. Each stage owns its fallback:
//! an expected failure yields the stage's degraded result and a
//! [`pipeline::StageStatus::Degraded`] report, never an error.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`stage`] | The [`Stage`] trait and [`Staged`] output wrapper |
//! | [`gateway`] | [`LlmGateway`], the single path to the generative model |
//! | [`stages`] | One type per pipeline stage |
//! | [`autolearn`] | [`Autolearner`], the serialized taxonomy profile owner |
//! | [`publish`] | Auto-publication through a [`pipeline::PublishingTarget`] |
//! | [`executor`] | [`PipelineExecutor`], which runs the stages in order |

pub mod autolearn;
pub mod executor;
pub mod gateway;
mod prompts;
pub mod publish;
pub mod stage;
pub mod stages;

pub use autolearn::Autolearner;
pub use executor::{PipelineDeps, PipelineExecutor};
pub use gateway::LlmGateway;
pub use publish::AutoPublisher;
pub use stage::{Stage, Staged};
