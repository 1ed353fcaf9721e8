//! Back-off schedule and HTTP status classification.

use std::time::Duration;

use pipeline::{GenerationError, RetryPolicy};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

/// Longest delay the schedule produces, whatever the attempt number.
const MAX_BACKOFF_SECS: u64 = 60;

/// Delay before retrying after failed attempt number `attempt` (zero-based):
/// 1 s, 2 s, 4 s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64
        .checked_shl(attempt)
        .unwrap_or(MAX_BACKOFF_SECS)
        .min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Delay before the next attempt: the server's `Retry-After` when it sent one,
/// the back-off schedule otherwise. Never longer than [`MAX_BACKOFF_SECS`].
pub fn retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    match policy {
        RetryPolicy::Retryable { after: Some(after) } => {
            (*after).min(Duration::from_secs(MAX_BACKOFF_SECS))
        }
        _ => backoff_delay(attempt),
    }
}

/// Reads a `Retry-After` header given in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Maps a non-success response to a [`GenerationError`].
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: String) -> GenerationError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return GenerationError::RateLimited {
            retry_after: retry_after(headers),
        };
    }
    GenerationError::Api {
        status: status.as_u16(),
        message: body,
    }
}

/// Maps a transport failure to a [`GenerationError`].
pub fn classify_transport(err: &reqwest::Error) -> GenerationError {
    if err.is_decode() {
        GenerationError::MalformedResponse {
            message: err.to_string(),
        }
    } else if err.is_builder() {
        GenerationError::Configuration {
            message: err.to_string(),
        }
    } else {
        GenerationError::Transient {
            message: err.to_string(),
        }
    }
}
