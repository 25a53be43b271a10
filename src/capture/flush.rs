//! Batch flush: local file, content store upload, announcement.
//!
//! Runs inline on the capture loop. The batch is already detached from the
//! capture state, so every failure here loses at most this one batch and
//! never causes a second flush.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::retry::{with_retry, RetryPolicy};
use crate::clients::{ClientError, ContentStore, Publisher};
use crate::storage::{BatchFileError, BatchFileWriter};
use crate::types::{Batch, ContentId};

/// Failure of one flush step.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("batch file: {0}")]
    File(#[from] BatchFileError),
    #[error("upload: {0}")]
    Upload(#[source] ClientError),
    #[error("announce: {0}")]
    Announce(#[source] ClientError),
}

/// Outcome of one flush.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub frames: usize,
    /// Local copy, when the write succeeded
    pub path: Option<PathBuf>,
    /// Content identifier, when the upload succeeded
    pub content_id: Option<ContentId>,
    /// Whether the content id reached the publisher
    pub announced: bool,
}

/// Persists sealed batches and announces their content id.
pub struct BatchFlusher {
    files: BatchFileWriter,
    store: Arc<dyn ContentStore>,
    publisher: Arc<dyn Publisher>,
    upload_retry: RetryPolicy,
}

impl BatchFlusher {
    pub fn new(
        files: BatchFileWriter,
        store: Arc<dyn ContentStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            files,
            store,
            publisher,
            upload_retry: RetryPolicy::none(),
        }
    }

    /// Retry failed uploads according to `policy`.
    pub fn with_upload_retry(mut self, policy: RetryPolicy) -> Self {
        self.upload_retry = policy;
        self
    }

    /// Flush `batch`, stamping the file name with the current local time.
    pub async fn flush(&self, batch: Batch) -> FlushReport {
        self.flush_at(batch, Local::now()).await
    }

    /// Flush `batch` using `at` for the file name.
    ///
    /// The file is written before the upload. A failed write is logged and
    /// the upload still proceeds from memory.
    pub async fn flush_at(&self, batch: Batch, at: DateTime<Local>) -> FlushReport {
        let frames = batch.len();
        let bytes = batch.render().into_bytes();
        let mut report = FlushReport {
            frames,
            path: None,
            content_id: None,
            announced: false,
        };

        // 1. Local copy
        match self.files.write(at, &bytes).await {
            Ok(path) => {
                info!(path = %path.display(), frames, "💾 Batch written");
                report.path = Some(path);
            }
            Err(e) => {
                error!(error = %FlushError::from(e), frames, "Batch file not written, uploading anyway");
            }
        }

        let name = report
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map_or_else(
                || BatchFileWriter::file_name_for(at),
                |n| n.to_string_lossy().into_owned(),
            );

        // 2. Upload
        let content_id = match with_retry(self.upload_retry, "content upload", || {
            self.store.put(&name, bytes.clone())
        })
        .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(error = %FlushError::Upload(e), frames, "Batch upload failed, batch dropped");
                return report;
            }
        };
        info!(content_id = %content_id, frames, "📦 Batch uploaded");
        report.content_id = Some(content_id.clone());

        // 3. Announce
        match self.publisher.publish_content(&content_id).await {
            Ok(()) => report.announced = true,
            Err(e) => {
                warn!(content_id = %content_id, error = %FlushError::Announce(e), "Content announcement failed");
            }
        }

        report
    }
}
