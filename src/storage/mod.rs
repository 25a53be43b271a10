//! Local persistence of flushed batches
//!
//! One flat text file per batch under the configured data directory.

pub mod batch_file;

pub use batch_file::{BatchFileError, BatchFileWriter, BATCH_FILE_TIME_FORMAT};
