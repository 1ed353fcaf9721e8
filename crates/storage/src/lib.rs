//! File-backed storage adapters.
//!
//! | Type | Implements | Format |
//! |------|------------|--------|
//! | [`JsonFileProfileStore`] | [`pipeline::ProfileStore`] | one pretty-printed JSON document, replaced atomically |
//! | [`JsonlRunLog`] | [`pipeline::RunLogSink`] | one JSON object per line, append-only |

mod profile_store;
mod run_log;

pub use profile_store::JsonFileProfileStore;
pub use run_log::JsonlRunLog;

use std::path::Path;

use pipeline::StoreError;

fn io_error(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Io {
        location: path.display().to_string(),
        message: err.to_string(),
    }
}

fn serde_error(err: serde_json::Error) -> StoreError {
    StoreError::Serialization {
        message: err.to_string(),
    }
}
