//! Error and retry-policy types for the editorial pipeline domain.
//!
//! There are two tiers of failure in a pipeline run:
//!
//! 1. **Expected** failures (the generative model is down, returned malformed
//!    output, a store is unreachable). These are represented by
//!    [`GenerationError`], [`StoreError`] and [`PublishError`] and are always
//!    absorbed by the stage that encountered them, which substitutes its
//!    degraded result.
//! 2. **Unexpected** failures, represented by [`PipelineError`]. These escape a
//!    stage and reach the orchestrator's outer boundary, which turns them into
//!    an error outcome.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::StageName;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let the caller decide whether to
/// re-invoke an operation or give up.
///
/// - `Retryable` errors: API timeouts, transient rate-limit responses, 5xx.
/// - `NonRetryable` errors: bad credentials, invalid configuration, malformed
///   requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run.
///
/// None of these are produced by an ordinary model or storage failure; those
/// are absorbed inside the owning stage. Reaching the orchestrator with one of
/// these means something is wrong with the input, the caller cancelled, or a
/// stage broke its own contract.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The article submitted for processing does not satisfy the input bounds.
    ///
    /// Produced at the API boundary, before any run starts.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the offending field (`"title"`, `"content"`).
        field: String,
        /// Human-readable description of the violated bound.
        reason: String,
    },

    /// A stage panicked while running.
    #[error("Stage '{stage}' panicked: {message}")]
    StagePanicked {
        /// Stage that was running when the panic occurred.
        stage: StageName,
        /// Panic payload rendered as text, if it was a string.
        message: String,
    },

    /// A run-state field was written twice.
    ///
    /// Each field of the run state belongs to exactly one stage; a second write
    /// indicates an orchestration bug.
    #[error("Run state field '{field}' was already written")]
    StateAlreadyWritten {
        /// Name of the field.
        field: String,
    },

    /// A stage needed an upstream field that has not been produced.
    #[error("Run state field '{field}' is not available yet")]
    StateMissing {
        /// Name of the field.
        field: String,
    },

    /// The caller cancelled the run.
    #[error("Pipeline run cancelled during stage '{stage}'")]
    Cancelled {
        /// Stage that was running (or about to run) when cancellation was observed.
        stage: StageName,
    },

    /// The pipeline or learning settings are out of range.
    ///
    /// Produced when configuration is loaded, before any run starts.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`crate::TextGenerator`] implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The provider rejected the request because of rate limiting.
    #[error("Rate limited by generative provider")]
    RateLimited {
        /// Delay requested by the provider, if any.
        retry_after: Option<Duration>,
    },

    /// A transient transport or server failure (timeout, connection reset, 5xx).
    #[error("Transient generative provider failure: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
    },

    /// The provider answered with a non-retryable error status.
    #[error("Generative provider error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// The provider answered, but the answer could not be used.
    #[error("Malformed generative response: {message}")]
    MalformedResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// The generator is not usable with its current configuration.
    #[error("Generator configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl GenerationError {
    /// Classifies this error for the caller's retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            GenerationError::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            GenerationError::Transient { .. } => RetryPolicy::Retryable { after: None },
            GenerationError::Api { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            GenerationError::Api { .. }
            | GenerationError::MalformedResponse { .. }
            | GenerationError::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }
}

/// Errors raised by the profile store and the run-log sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("Storage I/O error at '{location}': {message}")]
    Io {
        /// Path or address of the backing medium.
        location: String,
        /// Underlying error description.
        message: String,
    },

    /// The stored document could not be encoded or decoded.
    #[error("Storage serialisation error: {message}")]
    Serialization {
        /// Underlying error description.
        message: String,
    },
}

/// Errors raised by a [`crate::PublishingTarget`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    /// The target answered with an error status.
    #[error("Publishing target error {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// The target could not be reached.
    #[error("Publishing target unreachable: {message}")]
    Transport {
        /// Underlying error description.
        message: String,
    },

    /// The target accepted the request but its answer lacked an identifier.
    #[error("Publishing target returned no identifier for {what}")]
    MissingIdentifier {
        /// What was being created or looked up.
        what: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable_with_provider_delay() {
        let err = GenerationError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn server_errors_retry_but_client_errors_do_not() {
        let server = GenerationError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        let client = GenerationError::Api {
            status: 401,
            message: "bad key".into(),
        };
        assert!(server.retry_policy().is_retryable());
        assert_eq!(client.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn malformed_responses_are_not_retried() {
        let err = GenerationError::MalformedResponse {
            message: "no choices".into(),
        };
        assert!(!err.retry_policy().is_retryable());
    }
}
