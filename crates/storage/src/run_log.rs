use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{RunLogRecord, RunLogSink, StoreError};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{io_error, serde_error};

/// Appends run-outcome records to a JSON-lines file.
///
/// Appends from concurrent runs are serialized so lines never interleave.
#[derive(Debug)]
pub struct JsonlRunLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RunLogSink for JsonlRunLog {
    async fn record(&self, record: &RunLogRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record).map_err(serde_error)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        file.write_all(&line)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        file.flush().await.map_err(|e| io_error(&self.path, e))?;

        debug!(run_id = %record.run_id, path = %self.path.display(), "run recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{RunId, RunStatus, Timestamp};

    fn record(status: RunStatus) -> RunLogRecord {
        RunLogRecord {
            run_id: RunId::new_random(),
            input_excerpt: "Budget vote".into(),
            output_summary: serde_json::json!({"ready_for_publication": false}),
            status,
            execution_time_ms: 12.5,
            model: None,
            error: None,
            recorded_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn records_are_appended_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlRunLog::new(dir.path().join("runs.jsonl"));

        let first = record(RunStatus::Success);
        let second = record(RunStatus::Error);
        log.record(&first).await.unwrap();
        log.record(&second).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<RunLogRecord> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![first, second]);
    }

    #[tokio::test]
    async fn unwritable_location_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let log = JsonlRunLog::new(blocker.join("runs.jsonl"));
        let err = log.record(&record(RunStatus::Success)).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
