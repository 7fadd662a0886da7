//! Append-only JSON-lines trace log.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, TattvaError};
use crate::traits::TraceStore;
use crate::types::Trace;

/// Default log location relative to the working directory.
pub const DEFAULT_TRACE_LOG: &str = "logs/traces.jsonl";

/// Writes one JSON object per line. The parent directory is created on
/// first write.
pub struct JsonlTraceStore {
    path: PathBuf,
    // Serializes appends from concurrent requests so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlTraceStore {
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

impl Default for JsonlTraceStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_LOG)
    }
}

#[async_trait]
impl TraceStore for JsonlTraceStore {
    async fn save(&self, trace: &Trace) -> Result<()> {
        let mut line = serde_json::to_string(trace)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(TattvaError::storage)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(TattvaError::storage)?;
        file.write_all(line.as_bytes()).await.map_err(TattvaError::storage)?;
        file.flush().await.map_err(TattvaError::storage)?;

        debug!(trace_id = %trace.trace_id, path = %self.path.display(), "Trace appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_one_line_per_trace() {
        let dir = std::env::temp_dir().join(format!("tattva-traces-{}", uuid::Uuid::new_v4()));
        let store = JsonlTraceStore::new(dir.join("nested").join("traces.jsonl"));

        let first = Trace::new("Who is Kumbhakarna?");
        let second = Trace::new("Where is Kishkindha?");
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Trace = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.trace_id, first.trace_id);
        let raw: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(raw["user_query"], "Where is Kishkindha?");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
