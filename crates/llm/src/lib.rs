//! Generative text adapter for OpenAI-compatible chat-completions APIs.
//!
//! Implements [`pipeline::TextGenerator`]. Request formatting, response
//! parsing, per-request timeouts and exponential back-off live here; the
//! pipeline sees only the trait.

pub mod client;
pub mod config;
pub mod retry;

pub use client::OpenAiGenerator;
pub use config::LlmConfig;
