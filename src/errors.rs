//! Crate-specific error types for mmap-file.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for mmap-file operations.
pub type Result<T> = std::result::Result<T, MmapFileError>;

/// Error type covering open, mapping, access-mode, and boundary conditions.
///
/// [`EndOfStream`](MmapFileError::EndOfStream) and
/// [`ShortWrite`](MmapFileError::ShortWrite) are recoverable flow signals
/// rather than faults: a caller draining a file loops until the former, and
/// the latter carries the count of bytes actually placed, which the caller
/// must honor.
#[derive(Debug, Error)]
pub enum MmapFileError {
    /// Wrapper for `std::io::Error` from the file open/stat collaborators.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation not permitted by the access mode the handle was opened with.
    #[error("bad file descriptor")]
    BadDescriptor,

    /// Offset-based operation on a handle whose mapping has been closed.
    #[error("mapping closed")]
    Closed,

    /// Offset outside the mapped extent passed to a random-access call.
    #[error("invalid offset {offset} (mapped length {len})")]
    InvalidOffset {
        /// Requested offset.
        offset: u64,
        /// Length of the mapped extent.
        len: usize,
    },

    /// Seek that would place the cursor below zero.
    #[error("negative seek position")]
    NegativePosition,

    /// Cursor-based single-byte read with the cursor at or past the end.
    #[error("end of mapped file")]
    EndOfStream,

    /// Cursor or random-access write that could not place every byte.
    /// `written` bytes were copied into the mapping before the extent ran out.
    #[error("short write: {written} of {requested} bytes")]
    ShortWrite {
        /// Bytes actually written.
        written: usize,
        /// Bytes requested.
        requested: usize,
    },

    /// Backing file cannot be mapped on this host (e.g. larger than the
    /// address width can represent).
    #[error("invalid file {}: {}", .path.display(), .reason)]
    InvalidFile {
        /// Path of the offending file.
        path: PathBuf,
        /// Why the file is unmappable.
        reason: &'static str,
    },

    /// The OS refused to establish the mapping.
    #[error("could not map {}: {}", .path.display(), .source)]
    Map {
        /// Path of the file being mapped.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Flushing mapped pages (or the backing file's buffers) failed.
    #[error("sync failed: {0}")]
    Sync(String),
}

impl From<MmapFileError> for io::Error {
    fn from(err: MmapFileError) -> io::Error {
        match err {
            MmapFileError::Io(e) => e,
            MmapFileError::ShortWrite { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            MmapFileError::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            MmapFileError::InvalidOffset { .. } | MmapFileError::NegativePosition => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            MmapFileError::BadDescriptor => io::Error::new(io::ErrorKind::PermissionDenied, err),
            other => io::Error::other(other),
        }
    }
}
