//! Batch files: one flat text file per flushed batch.
//!
//! Files are named `data_<%Y-%m-%d_%H-%M-%S>.txt` after the local flush
//! time. A name that already exists gets a `-N` suffix; nothing is ever
//! overwritten.

use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// File-name timestamp format.
pub const BATCH_FILE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Upper bound on `-N` suffixes tried for one timestamp.
const MAX_NAME_COLLISIONS: u32 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum BatchFileError {
    #[error("failed to create data directory {}: {1}", .0.display())]
    CreateDir(PathBuf, #[source] std::io::Error),
    #[error("failed to write batch file {}: {1}", .0.display())]
    Write(PathBuf, #[source] std::io::Error),
    #[error("no free batch file name for {0} after {} attempts", MAX_NAME_COLLISIONS)]
    NameExhausted(String),
}

/// Writes rendered batches under a data directory.
#[derive(Debug, Clone)]
pub struct BatchFileWriter {
    data_dir: PathBuf,
}

impl BatchFileWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Base file name for a flush at `at`, without any collision suffix.
    pub fn file_name_for(at: DateTime<Local>) -> String {
        format!("data_{}.txt", at.format(BATCH_FILE_TIME_FORMAT))
    }

    /// Write `contents` to a fresh file named after `at`.
    ///
    /// Creates the data directory when missing. Returns the path written.
    pub async fn write(&self, at: DateTime<Local>, contents: &[u8]) -> Result<PathBuf, BatchFileError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| BatchFileError::CreateDir(self.data_dir.clone(), e))?;

        let stamp = at.format(BATCH_FILE_TIME_FORMAT).to_string();
        for n in 0..MAX_NAME_COLLISIONS {
            let name = if n == 0 {
                format!("data_{stamp}.txt")
            } else {
                format!("data_{stamp}-{n}.txt")
            };
            let path = self.data_dir.join(name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BatchFileError::Write(path, e)),
            };

            file.write_all(contents)
                .await
                .map_err(|e| BatchFileError::Write(path.clone(), e))?;
            file.flush()
                .await
                .map_err(|e| BatchFileError::Write(path.clone(), e))?;

            tracing::debug!(path = %path.display(), bytes = contents.len(), "Batch file written");
            return Ok(path);
        }

        Err(BatchFileError::NameExhausted(stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 17, 9, 30, 5)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            BatchFileWriter::file_name_for(at()),
            "data_2024-05-17_09-30-05.txt"
        );
    }

    #[tokio::test]
    async fn test_write_creates_dir_and_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = BatchFileWriter::new(dir.path().join("nested").join("sensor_data"));

        let path = writer.write(at(), b"hello").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "data_2024-05-17_09-30-05.txt");
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_collision_gets_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = BatchFileWriter::new(dir.path());

        let first = writer.write(at(), b"one").await.unwrap();
        let second = writer.write(at(), b"two").await.unwrap();
        let third = writer.write(at(), b"").await.unwrap();

        assert_eq!(second.file_name().unwrap(), "data_2024-05-17_09-30-05-1.txt");
        assert_eq!(third.file_name().unwrap(), "data_2024-05-17_09-30-05-2.txt");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert!(std::fs::read(&third).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_dir_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        let writer = BatchFileWriter::new(&blocker);
        let err = writer.write(at(), b"data").await.unwrap_err();
        assert!(matches!(err, BatchFileError::CreateDir(..)));
    }
}
