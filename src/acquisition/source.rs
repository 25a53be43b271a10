//! Byte source abstraction for sensor ingestion.
//!
//! Provides a unified trait for reading raw sensor bytes from different
//! sources: a serial device node (or FIFO) and stdin (replay).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer size per chunk.
const CHUNK_SIZE: usize = 256;

/// Events produced by a byte source.
#[derive(Debug, PartialEq, Eq)]
pub enum ByteEvent {
    /// One or more bytes were read.
    Bytes(Vec<u8>),
    /// Source reached end of data.
    Eof,
}

/// Trait abstracting where sensor bytes come from.
///
/// The capture loop calls [`next_chunk`](ByteSource::next_chunk) inside a
/// `select!` with cancellation, so implementations must be cancel-safe.
#[async_trait]
pub trait ByteSource: Send + 'static {
    /// Read the next chunk of bytes.
    ///
    /// Returns `ByteEvent::Eof` when no more data is available.
    async fn next_chunk(&mut self) -> Result<ByteEvent>;

    /// Human-readable name for logging (e.g. "/dev/ttyUSB0", "stdin").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Reader Source (any AsyncRead)
// ============================================================================

/// Wraps any async reader as a byte source.
pub struct ReaderSource<R> {
    reader: R,
    name: String,
    buffer: Box<[u8]>,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> ReaderSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            buffer: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            bytes_read: 0,
        }
    }

    /// Total bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send + 'static> ByteSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> Result<ByteEvent> {
        let n = self
            .reader
            .read(&mut self.buffer)
            .await
            .with_context(|| format!("Failed to read from {}", self.name))?;
        if n == 0 {
            return Ok(ByteEvent::Eof);
        }
        self.bytes_read += n as u64;
        Ok(ByteEvent::Bytes(self.buffer[..n].to_vec()))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Device Source (serial tty / FIFO)
// ============================================================================

/// Reads raw bytes from a device node such as `/dev/ttyUSB0`.
///
/// Line settings (baud rate, parity, stop bits) must already be applied to
/// the tty, e.g. `stty -F /dev/ttyUSB0 115200 raw cs8 -parenb -cstopb`.
pub struct DeviceSource {
    inner: ReaderSource<tokio::fs::File>,
    path: PathBuf,
    baud_rate: u32,
}

impl DeviceSource {
    /// Open the device for reading.
    pub async fn open(path: &Path, baud_rate: u32) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open sensor device {}", path.display()))?;

        tracing::info!(
            device = %path.display(),
            baud_rate,
            "Sensor device opened (8N1, line settings applied externally)"
        );

        Ok(Self {
            inner: ReaderSource::new(file, path.display().to_string()),
            path: path.to_path_buf(),
            baud_rate,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

#[async_trait]
impl ByteSource for DeviceSource {
    async fn next_chunk(&mut self) -> Result<ByteEvent> {
        self.inner.next_chunk().await
    }

    fn source_name(&self) -> &str {
        self.inner.source_name()
    }
}

// ============================================================================
// Stdin Source (replay)
// ============================================================================

/// Reads raw sensor bytes from stdin.
///
/// Used for bench replay: `cat flight.bin | airsense capture --stdin`
pub type StdinSource = ReaderSource<tokio::io::Stdin>;

/// Create a byte source over the process's stdin.
pub fn stdin_source() -> StdinSource {
    ReaderSource::new(tokio::io::stdin(), "stdin")
}
