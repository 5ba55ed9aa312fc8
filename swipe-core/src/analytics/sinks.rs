use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::session::SessionSnapshot;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sink io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for the final session snapshot.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn emit(&self, snapshot: &SessionSnapshot) -> Result<(), SinkError>;
}

/// Logs the snapshot as one JSON field on an `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl AnalyticsSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn emit(&self, snapshot: &SessionSnapshot) -> Result<(), SinkError> {
        let payload = serde_json::to_string(snapshot)?;
        info!(
            session = %snapshot.session_id,
            status = %snapshot.status,
            runtime_ms = snapshot.runtime.as_millis() as u64,
            snapshot = %payload,
            "analytics session closed"
        );
        Ok(())
    }
}

/// Appends one JSON document per session to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AnalyticsSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn emit(&self, snapshot: &SessionSnapshot) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(snapshot)?;
        line.push(b'\n');
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
