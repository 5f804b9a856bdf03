//! JSON-lines record sink, one serialized record per line.

use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use nobel_laureates::{HarvestError, HarvestResult, LaureateRecord, RecordSink};

use crate::config::OutputTarget;

/// Append-only JSONL writer. Each record is written and flushed while the
/// lock is held, so concurrent emits never interleave.
pub struct JsonlSink {
    out: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl JsonlSink {
    /// Open (or create) `path` for appending. Parent directories are created.
    pub async fn open(path: &Path) -> HarvestResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::from_writer(file))
    }

    pub fn stdout() -> Self {
        Self::from_writer(tokio::io::stdout())
    }

    pub fn from_writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    pub async fn for_target(target: &OutputTarget) -> HarvestResult<Self> {
        match target {
            OutputTarget::Stdout => Ok(Self::stdout()),
            OutputTarget::File(path) => Self::open(path).await,
        }
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn emit(&self, record: LaureateRecord) -> HarvestResult<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| HarvestError::Sink(format!("write failed: {e}")))?;
        out.flush()
            .await
            .map_err(|e| HarvestError::Sink(format!("flush failed: {e}")))?;
        Ok(())
    }
}
